//! Command-line construction.
//!
//! Handlers never build shell strings. A [`CommandLine`] is a program plus an
//! argument vector and a description of where the child's stdin comes from.
//! Data that would otherwise be piped in with `echo ... |` is attached with
//! [`CommandLine::stdin`].

use std::fmt;

/// Where a child process reads its standard input from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Input {
    /// `/dev/null`.
    #[default]
    Null,
    /// The given data is written to the child's stdin, which is then closed.
    Data(String),
    /// The child shares the caller's terminal (prompts, editors).
    Inherit,
}

/// A fully specified external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    input: Input,
}

impl CommandLine {
    /// Creates a command for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            input: Input::Null,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends `arg` only when `condition` holds.
    pub fn arg_if(self, condition: bool, arg: impl Into<String>) -> Self {
        if condition {
            self.arg(arg)
        } else {
            self
        }
    }

    /// Appends `flag value` when a value is present.
    ///
    /// ```
    /// use usc_exec::CommandLine;
    ///
    /// let cmd = CommandLine::new("useradd")
    ///     .opt("-d", Some("/home/chenxi"))
    ///     .opt("-u", None);
    /// assert_eq!(cmd.get_args(), ["-d", "/home/chenxi"]);
    /// ```
    pub fn opt(self, flag: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.arg(flag).arg(v),
            None => self,
        }
    }

    /// Feeds `data` to the child's stdin.
    pub fn stdin(mut self, data: impl Into<String>) -> Self {
        self.input = Input::Data(data.into());
        self
    }

    /// Lets the child read from the caller's terminal.
    pub fn interactive(mut self) -> Self {
        self.input = Input::Inherit;
        self
    }

    pub fn get_program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_input(&self) -> &Input {
        &self.input
    }

    /// The program that does the real work, looking through a `sudo` prefix.
    pub fn effective_program(&self) -> &str {
        if self.program == "sudo" {
            self.args.first().map(String::as_str).unwrap_or("sudo")
        } else {
            &self.program
        }
    }

    /// The complete argv, program first.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_argv(&self.argv()))
    }
}

/// Renders an argv as a copy-pasteable shell line.
///
/// Words made only of characters no shell treats specially mid-command
/// (`--type=service`, `docker,wheel`) are left bare; everything else goes
/// through `shlex`. A word `shlex` refuses to quote (it contains a NUL byte)
/// is shown verbatim.
pub fn render_argv(argv: &[String]) -> String {
    argv.iter()
        .map(|word| {
            if is_bare_word(word) {
                return word.clone();
            }
            match shlex::try_quote(word) {
                Ok(quoted) => quoted.into_owned(),
                Err(_) => word.clone(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_bare_word(word: &str) -> bool {
    !word.is_empty()
        && word
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"-_./:@+=,%".contains(&b))
}
