//! The `usc` grammar.
//!
//! ```text
//! usc <module> <action>:<value> [<param>:<value> ...]
//! usc <module> help | usc <module>:help
//! usc help [modules | examples | <module> | module:<module> | action:<module>.<action>]
//! ```
//!
//! Tokens are split on their first colon only, so values may contain colons
//! (paths, firewall rules, cron expressions). Parsing is purely syntactic;
//! whether a module or action exists is the dispatcher's business.

use crate::error::ParseError;
use crate::invocation::{HelpTopic, Invocation, Request};
use indexmap::IndexMap;

/// The reserved word that routes to the help service.
pub const HELP: &str = "help";

/// Parses an argument vector (without the program name).
///
/// ```
/// use usc_dispatch::{parse, Request};
///
/// let Request::Invoke(inv) = parse(["file", "cp:/a:b", "dest:/c:d"]).unwrap() else {
///     unreachable!()
/// };
/// assert_eq!(inv.action, "cp");
/// assert_eq!(inv.action_value, "/a:b");
/// assert_eq!(inv.parameters["dest"], "/c:d");
/// ```
pub fn parse<I, S>(args: I) -> Result<Request, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let args: Vec<S> = args.into_iter().collect();
    let tokens: Vec<&str> = args.iter().map(|s| s.as_ref()).collect();
    let mut tokens = tokens.into_iter();

    let module = tokens.next().ok_or(ParseError::MissingModule)?;

    if module == HELP {
        return parse_help_topic(tokens.next()).map(Request::Help);
    }
    if let Some(name) = module.strip_suffix(":help") {
        if name.is_empty() {
            return Err(ParseError::MissingModule);
        }
        return Ok(Request::Help(HelpTopic::Module(name.to_string())));
    }
    if module.is_empty() {
        return Err(ParseError::MissingModule);
    }
    if module.contains(':') {
        return Err(ParseError::MalformedModule(module.to_string()));
    }

    let action_token = tokens.next().ok_or(ParseError::MissingAction)?;
    if action_token == HELP {
        return Ok(Request::Help(HelpTopic::Module(module.to_string())));
    }

    let (action, action_value) = split_first_colon(action_token).unwrap_or((action_token, ""));
    if action.is_empty() {
        return Err(ParseError::MissingAction);
    }

    let mut parameters = IndexMap::new();
    for token in tokens {
        match split_first_colon(token) {
            Some((name, value)) if !name.is_empty() => {
                // Repeated names overwrite: the last occurrence wins.
                parameters.insert(name.to_string(), value.to_string());
            }
            _ => return Err(ParseError::MalformedParameter(token.to_string())),
        }
    }

    Ok(Request::Invoke(Invocation {
        module: module.to_string(),
        action: action.to_string(),
        action_value: action_value.to_string(),
        parameters,
    }))
}

/// Tokens after the topic are ignored.
fn parse_help_topic(token: Option<&str>) -> Result<HelpTopic, ParseError> {
    let Some(token) = token else {
        return Ok(HelpTopic::Modules);
    };
    let malformed = || ParseError::MalformedHelpTopic(token.to_string());

    match split_first_colon(token) {
        None => match token {
            "" => Err(malformed()),
            "modules" => Ok(HelpTopic::Modules),
            "examples" => Ok(HelpTopic::Examples),
            module => Ok(HelpTopic::Module(module.to_string())),
        },
        Some(("module", name)) if !name.is_empty() && !name.contains(':') => {
            Ok(HelpTopic::Module(name.to_string()))
        }
        Some(("action", path)) => match path.split_once('.') {
            Some((module, action)) if !module.is_empty() && !action.is_empty() => {
                Ok(HelpTopic::Action {
                    module: module.to_string(),
                    action: action.to_string(),
                })
            }
            _ => Err(malformed()),
        },
        Some(_) => Err(malformed()),
    }
}

fn split_first_colon(token: &str) -> Option<(&str, &str)> {
    token.split_once(':')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoke(args: &[&str]) -> Invocation {
        match parse(args) {
            Ok(Request::Invoke(inv)) => inv,
            other => panic!("expected an invocation, got {:?}", other),
        }
    }

    fn help(args: &[&str]) -> HelpTopic {
        match parse(args) {
            Ok(Request::Help(topic)) => topic,
            other => panic!("expected a help request, got {:?}", other),
        }
    }

    #[test]
    fn test_basic_invocation() {
        let inv = invoke(&["user", "add:chenxi", "home:/home/chenxi"]);
        assert_eq!(inv.module, "user");
        assert_eq!(inv.action, "add");
        assert_eq!(inv.action_value, "chenxi");
        assert_eq!(inv.parameters.len(), 1);
        assert_eq!(inv.parameters["home"], "/home/chenxi");
    }

    #[test]
    fn test_first_colon_only() {
        let inv = invoke(&["file", "cp:/a:b", "dest:/c:d"]);
        assert_eq!(inv.action, "cp");
        assert_eq!(inv.action_value, "/a:b");
        assert_eq!(inv.parameters["dest"], "/c:d");
    }

    #[test]
    fn test_bare_action_has_empty_value() {
        let inv = invoke(&["group", "list"]);
        assert_eq!(inv.action, "list");
        assert_eq!(inv.action_value, "");

        let inv = invoke(&["user", "list:"]);
        assert_eq!(inv.action, "list");
        assert_eq!(inv.action_value, "");
    }

    #[test]
    fn test_last_duplicate_wins_in_first_position() {
        let inv = invoke(&["user", "add:x", "home:/a", "shell:/bin/sh", "home:/b"]);
        assert_eq!(inv.parameters["home"], "/b");
        let names: Vec<_> = inv.parameters.keys().map(String::as_str).collect();
        assert_eq!(names, ["home", "shell"]);
    }

    #[test]
    fn test_empty_parameter_value_is_allowed() {
        let inv = invoke(&["user", "mod:chenxi", "group:,wheel"]);
        assert_eq!(inv.parameters["group"], ",wheel");
        let inv = invoke(&["user", "mod:chenxi", "comment:"]);
        assert_eq!(inv.parameters["comment"], "");
    }

    #[test]
    fn test_missing_module_and_action() {
        assert_eq!(parse(Vec::<String>::new()), Err(ParseError::MissingModule));
        assert_eq!(parse(["user"]), Err(ParseError::MissingAction));
        assert_eq!(parse(["user", ":chenxi"]), Err(ParseError::MissingAction));
        assert_eq!(parse([":help"]), Err(ParseError::MissingModule));
    }

    #[test]
    fn test_malformed_tokens() {
        assert_eq!(
            parse(["user", "add:x", "home"]),
            Err(ParseError::MalformedParameter("home".into()))
        );
        assert_eq!(
            parse(["user", "add:x", ":v"]),
            Err(ParseError::MalformedParameter(":v".into()))
        );
        assert_eq!(
            parse(["user:add", "x"]),
            Err(ParseError::MalformedModule("user:add".into()))
        );
    }

    #[test]
    fn test_help_forms() {
        assert_eq!(help(&["help"]), HelpTopic::Modules);
        assert_eq!(help(&["help", "modules"]), HelpTopic::Modules);
        assert_eq!(help(&["help", "examples"]), HelpTopic::Examples);
        assert_eq!(help(&["help", "user"]), HelpTopic::Module("user".into()));
        assert_eq!(help(&["help", "module:user"]), HelpTopic::Module("user".into()));
        assert_eq!(help(&["user:help"]), HelpTopic::Module("user".into()));
        assert_eq!(help(&["user", "help"]), HelpTopic::Module("user".into()));
        assert_eq!(
            help(&["help", "action:user.add"]),
            HelpTopic::Action {
                module: "user".into(),
                action: "add".into()
            }
        );
    }

    #[test]
    fn test_help_forms_agree() {
        let spellings: [&[&str]; 4] = [
            &["help", "user"],
            &["help", "module:user"],
            &["user:help"],
            &["user", "help"],
        ];
        for args in spellings {
            assert_eq!(help(args), HelpTopic::Module("user".into()), "{:?}", args);
        }
    }

    #[test]
    fn test_malformed_help_topics() {
        for topic in ["action:user", "action:.add", "action:user.", "module:", "bogus:x"] {
            assert_eq!(
                parse(["help", topic]),
                Err(ParseError::MalformedHelpTopic(topic.into())),
                "{}",
                topic
            );
        }
    }

    #[test]
    fn test_extra_help_tokens_are_ignored() {
        assert_eq!(help(&["help", "user", "trailing"]), HelpTopic::Module("user".into()));
    }
}
