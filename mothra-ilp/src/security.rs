//! Screening of user-supplied Prolog text
//!
//! Background knowledge, examples and settings are consulted by a real Prolog
//! system, so they must not call predicates that touch the file system, spawn
//! processes or alter the program. Directives are limited to the declarations
//! the learners understand.

use mothra_common::{Error, Result};

/// Predicates that may not appear as goals or functors
const ILLEGAL_PREDICATES: &[&str] = &[
    "shell",
    "system",
    "exec",
    "unix",
    "process_create",
    "halt",
    "consult",
    "reconsult",
    "ensure_loaded",
    "use_module",
    "load_files",
    "include",
    "open",
    "close",
    "see",
    "seen",
    "tell",
    "told",
    "append",
    "read",
    "read_term",
    "write",
    "writeq",
    "write_canonical",
    "print",
    "format",
    "assert",
    "asserta",
    "assertz",
    "retract",
    "retractall",
    "abolish",
    "delete_file",
    "rename_file",
    "make_directory",
    "delete_directory",
    "working_directory",
    "cd",
    "getenv",
    "setenv",
];

/// Illegal even without arguments
const ILLEGAL_ATOMS: &[&str] = &["halt", "seen", "told"];

/// Meta-call and term-building predicates; a goal or closure handed to them
/// could name any of the predicates above
const META_PREDICATES: &[&str] = &[
    "call",
    "apply",
    "maplist",
    "foldl",
    "exclude",
    "partition",
    "convlist",
    "phrase",
    "call_cleanup",
    "setup_call_cleanup",
    "with_output_to",
    "atom_to_term",
    "term_to_atom",
    "term_string",
    "read_term_from_atom",
];

/// Operators that build terms from lists
const ILLEGAL_OPERATORS: &[&str] = &["=.."];

/// Argument positions (1-based) that are run as goals
const GOAL_ARGUMENTS: &[(&str, &[usize])] = &[
    ("not", &[1]),
    ("once", &[1]),
    ("ignore", &[1]),
    ("forall", &[1, 2]),
    ("findall", &[2]),
    ("bagof", &[2]),
    ("setof", &[2]),
    ("aggregate_all", &[2]),
    ("catch", &[1, 3]),
];

/// Directives allowed in `:- ...` clauses
const ALLOWED_DIRECTIVES: &[&str] = &[
    "set",
    "mode",
    "modeh",
    "modeb",
    "determination",
    "dynamic",
    "discontiguous",
];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Unquoted or quoted atom, with whether `(` follows immediately
    Atom { name: String, functor: bool },
    Var,
    Symbol(String),
    /// `(`
    Open,
    /// `[` or `{`
    Bracket,
    Close,
    Comma,
    Neck,
    End,
    Other,
}

/// What the tokens inside a pair of brackets are
#[derive(Debug)]
enum Scope {
    Args { name: String, index: usize },
    Group { goal: bool },
    Data,
}

impl Scope {
    fn is_goal(&self) -> bool {
        match self {
            Scope::Args { name, index } => GOAL_ARGUMENTS
                .iter()
                .any(|(meta, positions)| *meta == name.as_str() && positions.contains(index)),
            Scope::Group { goal } => *goal,
            Scope::Data => false,
        }
    }
}

fn rejected(what: &str, name: &str) -> Error {
    Error::RejectedInput(format!("Illegal {} '{}' in input", what, name))
}

/// Reject text containing illegal predicates or directives, meta-calls, or
/// variables run as goals; `None` and empty text pass.
pub fn check_input(text: Option<&str>) -> Result<()> {
    let Some(text) = text else {
        return Ok(());
    };

    let tokens = tokenize(text)?;
    let mut in_body = false;
    let mut scopes: Vec<Scope> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let prev = i.checked_sub(1).and_then(|p| tokens.get(p));
        let next = tokens.get(i + 1);
        let goal_context = scopes.last().map_or(in_body, Scope::is_goal);
        let in_args = matches!(scopes.last(), Some(Scope::Args { .. }));
        let standalone_goal =
            goal_context && starts_goal(prev, in_args) && ends_goal(next);

        match token {
            Token::Neck if scopes.is_empty() => {
                let clause_start = prev.map_or(true, |p| *p == Token::End);
                if clause_start {
                    let directive = match next {
                        Some(Token::Atom { name, .. }) => name.as_str(),
                        _ => "",
                    };
                    if !ALLOWED_DIRECTIVES.contains(&directive) {
                        return Err(rejected("directive", directive));
                    }
                }
                in_body = true;
            }
            Token::End => {
                in_body = false;
                scopes.clear();
            }
            Token::Atom { name, functor } => {
                let name = name.as_str();
                let illegal = if *functor {
                    ILLEGAL_PREDICATES.contains(&name) || META_PREDICATES.contains(&name)
                } else {
                    ILLEGAL_ATOMS.contains(&name)
                        || (standalone_goal && ILLEGAL_PREDICATES.contains(&name))
                };
                if illegal {
                    return Err(rejected("predicate", name));
                }
            }
            Token::Var if standalone_goal => {
                return Err(Error::RejectedInput(
                    "Variable used as a goal in input".to_string(),
                ));
            }
            Token::Symbol(op) if ILLEGAL_OPERATORS.contains(&op.as_str()) => {
                return Err(rejected("operator", op));
            }
            Token::Open => {
                let scope = match prev {
                    Some(Token::Atom {
                        name,
                        functor: true,
                    }) => Scope::Args {
                        name: name.clone(),
                        index: 1,
                    },
                    _ => Scope::Group { goal: goal_context },
                };
                scopes.push(scope);
            }
            Token::Bracket => scopes.push(Scope::Data),
            Token::Close => {
                scopes.pop();
            }
            Token::Comma => {
                if let Some(Scope::Args { index, .. }) = scopes.last_mut() {
                    *index += 1;
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn starts_goal(prev: Option<&Token>, in_args: bool) -> bool {
    match prev {
        None | Some(Token::Neck | Token::Comma | Token::Open | Token::End) => true,
        Some(Token::Symbol(op)) => {
            matches!(op.as_str(), ";" | "->" | "*->" | "|" | "\\+") || (in_args && op == "^")
        }
        _ => false,
    }
}

fn ends_goal(next: Option<&Token>) -> bool {
    match next {
        None | Some(Token::Comma | Token::Close | Token::End) => true,
        Some(Token::Symbol(op)) => matches!(op.as_str(), ";" | "->" | "*->" | "|"),
        _ => false,
    }
}

fn is_symbol_char(c: char) -> bool {
    "+-*/\\^<>=~:.?@#&$".contains(c)
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '%' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            '\'' | '"' | '`' => {
                let (name, next) = quoted(&chars, i)?;
                i = next;
                if c == '\'' {
                    let functor = chars.get(i) == Some(&'(');
                    tokens.push(Token::Atom { name, functor });
                } else {
                    tokens.push(Token::Other);
                }
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            '[' | '{' => {
                tokens.push(Token::Bracket);
                i += 1;
            }
            ')' | ']' | '}' => {
                tokens.push(Token::Close);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            ';' | '|' => {
                tokens.push(Token::Symbol(c.to_string()));
                i += 1;
            }
            c if is_symbol_char(c) => {
                let start = i;
                while i < chars.len() && is_symbol_char(chars[i]) {
                    i += 1;
                }
                let run: String = chars[start..i].iter().collect();
                let layout_follows = chars
                    .get(i)
                    .map_or(true, |n| n.is_whitespace() || *n == '%');
                let token = match run.as_str() {
                    "." if layout_follows => Token::End,
                    ":-" | "?-" => Token::Neck,
                    _ => Token::Symbol(run),
                };
                tokens.push(token);
            }
            c if c.is_ascii_lowercase() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().collect();
                let functor = chars.get(i) == Some(&'(');
                tokens.push(Token::Atom { name, functor });
            }
            c if c.is_ascii_uppercase() || c == '_' => {
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Var);
            }
            c if c.is_ascii_digit() => {
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Other);
            }
            c if c.is_whitespace() => i += 1,
            _ => {
                tokens.push(Token::Other);
                i += 1;
            }
        }
    }

    Ok(tokens)
}

/// Read a quoted item starting at `start`; returns its text and the index after it
fn quoted(chars: &[char], start: usize) -> Result<(String, usize)> {
    let quote = chars[start];
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                text.push(chars[i + 1]);
                i += 2;
            }
            c if c == quote => {
                // doubled quote is an escaped quote
                if chars.get(i + 1) == Some(&quote) {
                    text.push(quote);
                    i += 2;
                } else {
                    return Ok((text, i + 1));
                }
            }
            c => {
                text.push(c);
                i += 1;
            }
        }
    }
    Err(Error::RejectedInput("Unterminated quoted atom in input".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_knowledge_passes() {
        let bk = "% molecules\n\
                  :- modeh(1, target(+molecule)).\n\
                  :- modeb(*, has_atom(+molecule, -atom)).\n\
                  :- set(noise, 0).\n\
                  has_atom(d1, 'A 1').\n\
                  atom_charge(a1, -0.25).\n\
                  big(X) :- atom_charge(X, C), C > 0.5.\n";
        assert!(check_input(Some(bk)).is_ok());
        assert!(check_input(None).is_ok());
        assert!(check_input(Some("")).is_ok());
    }

    #[test]
    fn test_illegal_goals_rejected() {
        for text in [
            "p(X) :- shell('rm -rf /').",
            "p :- halt.",
            "p(X) :- 'system'(X).",
            "q :- open(f, write, S), close(S).",
            "r :- assert(foo(1)).",
            "p :- call(shell, 'touch /tmp/x').",
            "p :- G =.. [shell, 'ls'], G.",
            "p :- atom_to_term('shell(x)', T, _), T.",
            "p :- term_to_atom(T, 'halt'), once(T).",
            "p :- maplist(shell, ['ls']).",
            "p :- shell.",
            "p(G) :- \\+ G.",
            "p(G) :- not(G).",
            "p(G) :- findall(x, G, _).",
            "p(G) :- q, (r ; G).",
            "p(G) :- forall(member(G, [halt]), G).",
        ] {
            let err = check_input(Some(text)).unwrap_err();
            assert!(matches!(err, Error::RejectedInput(_)), "{}", text);
        }
    }

    #[test]
    fn test_variables_outside_goal_position_pass() {
        let bk = "p(X) :- q(X, Y), Y > 0, \\+ r(X).\n\
                  s(L, N) :- findall(X, member(X, L), Xs), length(Xs, N).\n\
                  t(X) :- X = f(Y), (Y == a -> true ; u(Y)).\n\
                  v(X, Z) :- Z is X^2, bagof(A, B^w(A, B), _).\n";
        check_input(Some(bk)).unwrap();
    }

    #[test]
    fn test_illegal_directive_rejected() {
        let err = check_input(Some(":- initialization(main).")).unwrap_err();
        assert!(err.to_string().contains("initialization"));
    }

    #[test]
    fn test_names_inside_data_are_not_goals() {
        // quoted strings and constants that merely spell a predicate name
        assert!(check_input(Some("label(a1, \"shell(x)\").")).is_ok());
        assert!(check_input(Some("material(m1, shell).")).is_ok());
        assert!(check_input(Some("/* halt. */ p(1).")).is_ok());
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(check_input(Some("p('abc).")).is_err());
    }
}
