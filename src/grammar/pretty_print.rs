use crowbook_text_processing::escape;
use serde::Serialize;

use super::{Conflict, FirstFollow, Grammar, Lr0Automaton, SlrTable, EPSILON};
use crate::parser::ParseStep;

fn tex_symbols<'a, I: IntoIterator<Item = &'a str>>(symbols: I, sep: &str) -> String {
    symbols
        .into_iter()
        .map(|s| if s == EPSILON { "\\epsilon".to_string() } else { escape::tex(s).to_string() })
        .collect::<Vec<_>>()
        .join(sep)
}

/// Right-aligns every column of `rows` and joins cells with ` | `.
fn aligned(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let width: Vec<usize> = (0..columns)
        .map(|j| {
            rows.iter()
                .map(|r| r.get(j).map(|s| s.chars().count()).unwrap_or(0))
                .max()
                .unwrap_or(0)
        })
        .collect();

    rows.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, s)| format!("{:>width$}", s, width = width[i]))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductionOutput<'a> {
    pub left: &'a str,
    /// `(production id, right-hand side)`, `ε` for an empty side.
    pub rights: Vec<(usize, Vec<&'a str>)>,
}

impl ProductionOutput<'_> {
    fn right_symbols(right: &[&str]) -> Vec<String> {
        if right.is_empty() {
            vec![EPSILON.to_string()]
        } else {
            right.iter().map(|s| s.to_string()).collect()
        }
    }

    pub fn to_plaintext(&self, left_width: usize) -> String {
        self.rights
            .iter()
            .enumerate()
            .map(|(i, (id, right))| {
                let right = Self::right_symbols(right).join(" ");
                if i == 0 {
                    format!("{:>width$} -> {}  ({})", self.left, right, id, width = left_width)
                } else {
                    format!("{:>width$} | {}  ({})", "", right, id, width = left_width)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        let right = self
            .rights
            .iter()
            .map(|(_, right)| {
                if right.is_empty() {
                    "\\epsilon".to_string()
                } else {
                    tex_symbols(right.iter().copied(), " \\ ")
                }
            })
            .collect::<Vec<_>>()
            .join(" \\mid ");
        format!("{} & \\rightarrow & {}", escape::tex(self.left), right)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductionOutputVec<'a> {
    productions: Vec<ProductionOutput<'a>>,
}

impl ProductionOutputVec<'_> {
    pub fn to_plaintext(&self) -> String {
        let left_max_len = self
            .productions
            .iter()
            .map(|p| p.left.chars().count())
            .max()
            .unwrap_or(0);
        self.productions
            .iter()
            .map(|s| s.to_plaintext(left_max_len))
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        std::iter::once("\\[\\begin{array}{cll}".to_string())
            .chain(self.productions.iter().map(|s| s.to_latex()))
            .chain(std::iter::once("\\end{array}\\]".to_string()))
            .collect::<Vec<String>>()
            .join("\\\\\n")
    }
}

impl Grammar {
    /// Productions grouped by left side, in order of first appearance.
    pub fn to_production_output_vec(&self) -> ProductionOutputVec<'_> {
        let mut productions: Vec<ProductionOutput> = Vec::new();
        for p in self.productions() {
            let right: Vec<&str> = p.right.iter().map(String::as_str).collect();
            match productions.iter_mut().find(|o| o.left == p.left) {
                Some(o) => o.rights.push((p.id, right)),
                None => productions.push(ProductionOutput {
                    left: &p.left,
                    rights: vec![(p.id, right)],
                }),
            }
        }
        ProductionOutputVec { productions }
    }
}

#[derive(Debug, Clone, Serialize)]
struct NonTerminalOutput<'a> {
    name: &'a str,
    nullable: bool,
    first: Vec<&'a str>,
    follow: Vec<&'a str>,
}

impl NonTerminalOutput<'_> {
    fn to_plaintext(&self) -> String {
        format!(
            "{} | {} | {} | {}",
            self.name,
            self.nullable,
            self.first.join(", "),
            self.follow.join(", ")
        )
    }

    fn to_latex(&self) -> String {
        format!(
            "{} & {} & {} & {}",
            escape::tex(self.name),
            self.nullable,
            tex_symbols(self.first.iter().copied(), "\\ "),
            tex_symbols(self.follow.iter().copied(), "\\ ")
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NonTerminalOutputVec<'a> {
    data: Vec<NonTerminalOutput<'a>>,
}

impl NonTerminalOutputVec<'_> {
    pub fn to_plaintext(&self) -> String {
        self.data
            .iter()
            .map(|s| s.to_plaintext())
            .collect::<Vec<String>>()
            .join("\n")
    }

    pub fn to_latex(&self) -> String {
        let content = self
            .data
            .iter()
            .map(|e| e.to_latex())
            .collect::<Vec<_>>()
            .join("\\\\\n");

        "\\begin{tabular}{c|c|c|c}\n".to_string()
            + "Symbol & Nullable & First & Follow\\\\\\hline\n"
            + &content
            + "\\\\\n\\end{tabular}"
    }
}

impl FirstFollow {
    /// One row per nonterminal, augmented start included.
    pub fn to_non_terminal_output_vec<'a>(&'a self, g: &'a Grammar) -> NonTerminalOutputVec<'a> {
        let data = g
            .non_terminals()
            .iter()
            .map(|nt| NonTerminalOutput {
                name: nt,
                nullable: self.is_nullable(nt),
                first: self.first(nt).iter().map(String::as_str).collect(),
                follow: self.follow(nt).iter().map(String::as_str).collect(),
            })
            .collect();
        NonTerminalOutputVec { data }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StateOutput {
    pub id: usize,
    pub kernel: Vec<String>,
    /// Items added by closure.
    pub extend: Vec<String>,
    pub edges: Vec<(String, usize)>,
}

impl StateOutput {
    pub fn to_plaintext(&self) -> String {
        let mut out = format!("I{}:\n{}", self.id, self.kernel.join("\n"));
        if !self.extend.is_empty() {
            out.push_str("\n---\n");
            out.push_str(&self.extend.join("\n"));
        }
        if !self.edges.is_empty() {
            out.push_str("\n===\n");
            out.push_str(
                &self
                    .edges
                    .iter()
                    .map(|(symbol, to)| format!("- {} -> I{}", symbol, to))
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
        out
    }

    fn node_to_latex(&self) -> String {
        let content = self
            .kernel
            .iter()
            .chain(self.extend.iter())
            .map(|item| format!("${}$", escape::tex(item).replace(EPSILON, "\\epsilon")))
            .collect::<Vec<_>>()
            .join(" \\\\ \n");
        let placement = match self.id {
            0 => String::new(),
            id if id % 2 == 0 => format!(" [below of = I_{}] ", id - 2),
            id => format!(" [right of = I_{}] ", id - 1),
        };
        format!(
            "\\node [block] (I_{}){}\n{{\n$I_{}$\\\\\n{}\n}};",
            self.id, placement, self.id, content
        )
    }

    fn edges_to_latex(&self) -> String {
        self.edges
            .iter()
            .map(|(symbol, to)| {
                format!(
                    "\\path [->] (I_{}) edge {} node [above]{{{}}} (I_{});",
                    self.id,
                    if self.id == *to { "[loop left]" } else { "[right]" },
                    escape::tex(symbol),
                    to
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AutomatonOutput {
    pub states: Vec<StateOutput>,
}

impl AutomatonOutput {
    pub fn to_plaintext(&self) -> String {
        self.states
            .iter()
            .map(|s| s.to_plaintext())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn to_latex(&self) -> String {
        format!(
            "\\begin{{tikzpicture}}[node distance=5cm,block/.style={{state, rectangle, text width=6em}}]\n{}\n\\end{{tikzpicture}}",
            self.states
                .iter()
                .map(|s| s.node_to_latex())
                .chain(self.states.iter().map(|s| s.edges_to_latex()))
                .collect::<Vec<_>>()
                .join("\n")
        )
    }
}

impl Lr0Automaton {
    pub fn to_output(&self, g: &Grammar) -> AutomatonOutput {
        let states = self
            .states()
            .iter()
            .map(|state| StateOutput {
                id: state.id,
                kernel: state.kernel.iter().map(|i| i.display(g).to_string()).collect(),
                extend: state
                    .items
                    .difference(&state.kernel)
                    .map(|i| i.display(g).to_string())
                    .collect(),
                edges: self
                    .edges(state.id)
                    .iter()
                    .map(|(symbol, to)| (symbol.clone(), *to))
                    .collect(),
            })
            .collect();
        AutomatonOutput { states }
    }
}

/// ACTION and GOTO side by side, one row per state.
#[derive(Debug, Clone, Serialize)]
pub struct TableOutput {
    pub terminals: Vec<String>,
    pub non_terminals: Vec<String>,
    /// Cells in column order, empty where the entry is Error / undefined.
    pub rows: Vec<Vec<String>>,
    pub conflicts: Vec<Conflict>,
}

impl TableOutput {
    pub fn to_plaintext(&self) -> String {
        let header: Vec<String> = std::iter::once(String::new())
            .chain(self.terminals.iter().cloned())
            .chain(self.non_terminals.iter().cloned())
            .collect();
        let mut rows = vec![header];
        for (i, row) in self.rows.iter().enumerate() {
            rows.push(std::iter::once(i.to_string()).chain(row.iter().cloned()).collect());
        }

        let mut out = aligned(&rows);
        for c in &self.conflicts {
            out.push('\n');
            out.push_str(&c.to_string());
            if c.expected {
                out.push_str(" (expected)");
            }
        }
        out
    }

    pub fn to_latex(&self) -> String {
        let header = format!(
            "\\begin{{tabular}}{{c{}}}\n & \\multicolumn{{{}}}{{c}}{{action}} & \\multicolumn{{{}}}{{|c}}{{goto}}\\\\",
            "|l".repeat(self.terminals.len() + self.non_terminals.len()),
            self.terminals.len(),
            self.non_terminals.len(),
        );
        let first_row = std::iter::once(String::new())
            .chain(
                self.terminals
                    .iter()
                    .chain(self.non_terminals.iter())
                    .map(|s| escape::tex(s).to_string()),
            )
            .collect::<Vec<_>>()
            .join(" & ");

        let content = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                std::iter::once(i.to_string())
                    .chain(row.iter().enumerate().map(|(j, cell)| {
                        let conflicted = j < self.terminals.len()
                            && self
                                .conflicts
                                .iter()
                                .any(|c| c.state == i && c.terminal == self.terminals[j]);
                        if conflicted {
                            format!("{{\\color{{red}}{}}}", cell)
                        } else {
                            cell.clone()
                        }
                    }))
                    .collect::<Vec<_>>()
                    .join(" & ")
            })
            .collect::<Vec<_>>()
            .join(" \\\\\n");

        format!("{}\n{} \\\\\\hline\n{}\n\\end{{tabular}}", header, first_row, content)
    }
}

impl SlrTable {
    pub fn to_output(&self, conflicts: &[Conflict]) -> TableOutput {
        let rows = (0..self.state_count())
            .map(|s| {
                let action = self.action_row(s);
                let goto = self.goto_row(s);
                self.terminals()
                    .iter()
                    .map(|t| action.get(t).map(|a| a.to_string()).unwrap_or_default())
                    .chain(
                        self.non_terminals()
                            .iter()
                            .map(|nt| goto.get(nt).map(|g| g.to_string()).unwrap_or_default()),
                    )
                    .collect()
            })
            .collect();
        TableOutput {
            terminals: self.terminals().to_vec(),
            non_terminals: self.non_terminals().to_vec(),
            rows,
            conflicts: conflicts.to_vec(),
        }
    }
}

/// A parse trace as a table: step, stack, input, action.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutputVec<'a> {
    steps: &'a [ParseStep],
}

impl<'a> StepOutputVec<'a> {
    pub fn new(steps: &'a [ParseStep]) -> Self {
        Self { steps }
    }

    fn action_text(step: &ParseStep) -> String {
        match &step.production {
            Some(p) => format!("{} ({})", step.action, p),
            None => step.action.to_string(),
        }
    }

    pub fn to_plaintext(&self) -> String {
        let mut rows = vec![vec![
            "step".to_string(),
            "stack".to_string(),
            "input".to_string(),
            "action".to_string(),
        ]];
        rows.extend(self.steps.iter().map(|s| {
            vec![
                s.index.to_string(),
                s.stack.clone(),
                s.input.clone(),
                Self::action_text(s),
            ]
        }));
        aligned(&rows)
    }

    pub fn to_latex(&self) -> String {
        let content = self
            .steps
            .iter()
            .map(|s| {
                format!(
                    "{} & {} & {} & {}",
                    s.index,
                    escape::tex(&s.stack),
                    escape::tex(&s.input),
                    escape::tex(&Self::action_text(s)).replace(EPSILON, "$\\epsilon$")
                )
            })
            .collect::<Vec<_>>()
            .join("\\\\\n");
        "\\begin{tabular}{r|l|l|l}\n".to_string()
            + "Step & Stack & Input & Action\\\\\\hline\n"
            + &content
            + "\\\\\n\\end{tabular}"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr_grammar() -> Grammar {
        Grammar::parse("E -> E + T | T\nT -> id | ε").unwrap()
    }

    #[test]
    fn productions_plaintext() {
        let g = expr_grammar();
        assert_eq!(
            g.to_production_output_vec().to_plaintext(),
            "S' -> E  (0)\n E -> E + T  (1)\n   | T  (2)\n T -> id  (3)\n   | ε  (4)"
        );
    }

    #[test]
    fn productions_latex_uses_epsilon() {
        let g = expr_grammar();
        let latex = g.to_production_output_vec().to_latex();
        assert!(latex.contains("T & \\rightarrow & id \\mid \\epsilon"));
        assert!(latex.starts_with("\\[\\begin{array}{cll}"));
    }

    #[test]
    fn first_follow_rows() {
        let g = expr_grammar();
        let ff = FirstFollow::compute(&g).unwrap();
        let out = ff.to_non_terminal_output_vec(&g);
        assert_eq!(out.to_plaintext(), "E | true | +, id, ε | $, +\nS' | true | +, id, ε | $\nT | true | id, ε | $, +");
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["data"][0]["name"], "E");
    }

    #[test]
    fn automaton_plaintext_separates_kernel_and_closure() {
        let g = Grammar::parse("S -> a").unwrap();
        let a = Lr0Automaton::build(&g);
        let text = a.to_output(&g).to_plaintext();
        assert!(text.starts_with("I0:\n0. S' -> . S\n---\n1. S -> . a\n===\n- S -> I1\n- a -> I2"));
    }

    #[test]
    fn table_plaintext_has_all_columns() {
        let g = Grammar::parse("S -> a").unwrap();
        let ff = FirstFollow::compute(&g).unwrap();
        let a = Lr0Automaton::build(&g);
        let (t, c) = SlrTable::build(&g, &a, &ff);
        let out = t.to_output(&c);
        assert_eq!(out.terminals, vec!["$", "a"]);
        assert_eq!(out.non_terminals, vec!["S"]);
        assert_eq!(out.rows[0], vec!["", "s2", "1"]);
        assert_eq!(out.rows[1], vec!["acc", "", ""]);
        assert_eq!(out.rows[2], vec!["r1", "", ""]);
        assert!(out.to_latex().contains("\\multicolumn{2}{c}{action}"));
    }
}
