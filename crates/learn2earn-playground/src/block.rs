//! Indentation tree for learner programs.
//!
//! Source text is turned into a forest of [`Line`]s where every line owns
//! the lines indented beneath it. Blank lines and `#` comments are dropped
//! here, so a block may contain empty lines without ending early. Trailing
//! comments are cut from the stored text.

use crate::lexer::strip_comment;

/// Width of a tab when measuring indentation.
const TAB_WIDTH: usize = 4;

/// One non-blank source line and the lines nested under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number in the original source.
    pub number: usize,
    /// Leading whitespace width.
    pub indent: usize,
    /// Line text with surrounding whitespace removed.
    pub text: String,
    /// Lines indented deeper than this one, up to the next dedent.
    pub children: Vec<Line>,
}

impl Line {
    /// Returns every nested line in source order, depth first.
    pub fn descendants(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        collect(&self.children, &mut out);
        out
    }
}

fn collect<'a>(lines: &'a [Line], out: &mut Vec<&'a Line>) {
    for line in lines {
        out.push(line);
        collect(&line.children, out);
    }
}

/// A parsed learner program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    /// Top-level lines.
    pub lines: Vec<Line>,
}

impl Program {
    /// Builds the indentation tree for `source`.
    ///
    /// # Examples
    ///
    /// ```
    /// use learn2earn_playground::Program;
    ///
    /// let program = Program::parse("for i in range(3):\n    print(i)\nprint('done')");
    /// assert_eq!(program.lines.len(), 2);
    /// assert_eq!(program.lines[0].children[0].text, "print(i)");
    /// ```
    pub fn parse(source: &str) -> Self {
        Self::from_lines(source.lines())
    }

    /// Builds the indentation tree from individual source lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roots = Vec::new();
        let mut open: Vec<Line> = Vec::new();

        for (i, raw) in lines.into_iter().enumerate() {
            let raw = raw.as_ref();
            let text = strip_comment(raw.trim());
            if text.is_empty() {
                continue;
            }
            let indent = indent_width(raw);

            while open.last().is_some_and(|top| top.indent >= indent) {
                if let Some(done) = open.pop() {
                    attach(&mut open, &mut roots, done);
                }
            }
            open.push(Line {
                number: i + 1,
                indent,
                text: text.to_string(),
                children: Vec::new(),
            });
        }

        while let Some(done) = open.pop() {
            attach(&mut open, &mut roots, done);
        }

        Self { lines: roots }
    }

    /// Returns `true` if the program has no executable lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

fn attach(open: &mut [Line], roots: &mut Vec<Line>, line: Line) {
    match open.last_mut() {
        Some(parent) => parent.children.push(line),
        None => roots.push(line),
    }
}

fn indent_width(raw: &str) -> usize {
    raw.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}
