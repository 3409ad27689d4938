// File: crates/metasaver-core/src/command.rs

//! Typed transcoder command lines.
//!
//! A [`TranscodeCommand`] is an ordered list of flag/value directives. It is
//! turned into process arguments (or a quoted display string) only at the
//! boundary, so paths with spaces never need hand-written quoting.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// One element of a transcoder command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// A flag without a value, e.g. `-y`.
    Switch(&'static str),
    /// A flag followed by exactly one value, e.g. `-q:v 2`.
    Pair(&'static str, String),
    /// `-i <path>`.
    Input(PathBuf),
    /// The positional output path. Always last.
    Output(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TranscodeCommand {
    directives: Vec<Directive>,
}

impl TranscodeCommand {
    pub fn builder() -> CommandBuilder {
        CommandBuilder::default()
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn input_path(&self) -> Option<&Path> {
        self.directives.iter().find_map(|d| match d {
            Directive::Input(path) => Some(path.as_path()),
            _ => None,
        })
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.directives.iter().find_map(|d| match d {
            Directive::Output(path) => Some(path.as_path()),
            _ => None,
        })
    }

    /// Every value given for `flag`, in order.
    pub fn values_of(&self, flag: &str) -> Vec<&str> {
        self.directives
            .iter()
            .filter_map(|d| match d {
                Directive::Pair(f, value) if *f == flag => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The first value given for `flag`.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.values_of(flag).into_iter().next()
    }

    pub fn has_switch(&self, flag: &str) -> bool {
        self.directives
            .iter()
            .any(|d| matches!(d, Directive::Switch(f) if *f == flag))
    }

    /// Flattens the directives into process arguments, paths kept as-is.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args = Vec::with_capacity(self.directives.len() * 2);
        for directive in &self.directives {
            match directive {
                Directive::Switch(flag) => args.push(OsString::from(flag)),
                Directive::Pair(flag, value) => {
                    args.push(OsString::from(flag));
                    args.push(OsString::from(value));
                }
                Directive::Input(path) => {
                    args.push(OsString::from("-i"));
                    args.push(path.as_os_str().to_owned());
                }
                Directive::Output(path) => args.push(path.as_os_str().to_owned()),
            }
        }
        args
    }

    /// A single-string rendering for logs and for transcoders that take one
    /// command string. Tokens with whitespace or quotes are double-quoted.
    pub fn to_command_line(&self) -> String {
        self.to_args()
            .iter()
            .map(|arg| quote_token(&arg.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_token(token: &str) -> String {
    let needs_quotes = token.is_empty()
        || token
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\'' || c == '\\');
    if !needs_quotes {
        return token.to_string();
    }

    let mut quoted = String::with_capacity(token.len() + 2);
    quoted.push('"');
    for c in token.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Builds a [`TranscodeCommand`] one directive at a time.
#[derive(Debug, Default)]
pub struct CommandBuilder {
    directives: Vec<Directive>,
}

impl CommandBuilder {
    /// `-y`: overwrite the output without asking.
    pub fn overwrite(mut self) -> Self {
        self.directives.push(Directive::Switch("-y"));
        self
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.directives.push(Directive::Input(path.into()));
        self
    }

    pub fn pair(mut self, flag: &'static str, value: impl Into<String>) -> Self {
        self.directives.push(Directive::Pair(flag, value.into()));
        self
    }

    /// `-map_metadata -1`: drop every global metadata tag from the output.
    pub fn drop_global_metadata(self) -> Self {
        self.pair("-map_metadata", "-1")
    }

    /// Blanks `key` at container level.
    pub fn clear_tag(self, key: &str) -> Self {
        self.pair("-metadata", format!("{key}="))
    }

    /// Blanks `key` on the first video stream.
    pub fn clear_first_video_stream_tag(self, key: &str) -> Self {
        self.pair("-metadata:s:v:0", format!("{key}="))
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.pair("-vf", filter)
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> TranscodeCommand {
        self.directives.push(Directive::Output(path.into()));
        TranscodeCommand {
            directives: self.directives,
        }
    }
}
