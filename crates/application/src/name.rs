//! Experiment names: `<application>-<scenario>-<objective>...`, and the lexer that
//! splits such a name back into its parts.

use thiserror::Error;
use tracing::debug;

use crate::filter::{filter_objectives, filter_scenarios};
use crate::types::Application;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// More than one combination of scenario and objectives produces the name.
    #[error("ambiguous name '{name}'")]
    Ambiguous { name: String },
    #[error("invalid name '{name}', could not find {candidates}")]
    Invalid { name: String, candidates: String },
    #[error("invalid name '{name}'")]
    NoMatch { name: String },
    #[error("scenario is required (should be one of '{names}')")]
    ScenarioRequired { names: String },
    #[error("unknown scenario '{scenario}' ({hint})")]
    UnknownScenario { scenario: String, hint: String },
    #[error("unknown objectives {names}")]
    UnknownObjectives { names: String },
}

/// Lowercases `name` and drops everything outside `[a-z0-9.-]`.
pub fn clean_name(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '.')
        .collect()
}

/// Canonical experiment name for the (already filtered) application. Objectives are
/// left out when they are the defaults.
pub fn experiment_name(application: &Application) -> String {
    let mut app = application.clone();
    app.apply_defaults();

    let mut names = Vec::with_capacity(1 + app.scenarios.len() + app.objectives.len());
    names.push(app.name().to_string());
    names.extend(app.scenarios.iter().map(|s| clean_name(&s.name)));
    if !app.has_default_objectives() {
        names.extend(app.objectives.iter().map(|o| clean_name(&o.name)));
    }
    names.join("-")
}

/// Filters the scenarios and objectives of `app` to the ones named by `name`.
///
/// Fails with [`NameError::Ambiguous`] when several scenario/objective combinations
/// spell the same name: for application `a` with scenarios `s` and `s-s` and objectives
/// `s-o` and `o`, `a-s-s-o` is either `s` + `s-o` or `s-s` + `o`. Callers should fall
/// back to [`filter_scenarios`] and [`filter_objectives`] in that case.
pub fn filter_by_experiment_name(app: &mut Application, name: &str) -> Result<(), NameError> {
    let lexer = Lexer::new(app, name);
    let mut state = LexerState::default();

    // The application name must lead
    lexer.next(&mut state)?;

    let scenario = lexer.next(&mut state)?.unwrap_or_default();
    filter_scenarios(app, &scenario)?;

    let mut objectives = Vec::new();
    while let Some(o) = lexer.next(&mut state)? {
        objectives.push(o);
    }
    debug!(experiment = name, scenario = %scenario, objectives = ?objectives, "experiment name resolved");
    filter_objectives(app, &objectives)
}

const APPLICATION: usize = 0;
const OBJECTIVE: usize = 2;

/// Cursor of the lexer; copied for speculative parses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LexerState {
    pos: usize,
    token_type: usize,
}

struct Lexer<'a> {
    input: &'a str,
    tokens: [Vec<String>; 3],
}

impl<'a> Lexer<'a> {
    /// Builds the vocabulary from the defaulted application. Objectives repeat, so
    /// an objective whose cleaned name is empty is left out.
    fn new(application: &Application, input: &'a str) -> Self {
        let mut app = application.clone();
        app.apply_defaults();
        Self {
            input,
            tokens: [
                vec![app.name().to_string()],
                app.scenarios.iter().map(|s| clean_name(&s.name)).collect(),
                app.objectives.iter().map(|o| clean_name(&o.name)).filter(|o| !o.is_empty()).collect(),
            ],
        }
    }

    /// Next token, or `None` at the end of the input.
    fn next(&self, state: &mut LexerState) -> Result<Option<String>, NameError> {
        if state.pos == self.input.len() {
            return Ok(None);
        }

        // An application without scenarios has nothing to consume here
        if state.token_type > APPLICATION && state.token_type < OBJECTIVE && self.tokens[state.token_type].is_empty() {
            state.token_type += 1;
            return Ok(Some(String::new()));
        }

        let rest = &self.input[state.pos..];
        let vocabulary = &self.tokens[state.token_type];
        let matches: Vec<&String> = vocabulary.iter().filter(|t| rest.starts_with(t.as_str())).collect();

        match matches.as_slice() {
            [] => Err(NameError::Invalid { name: self.input.to_string(), candidates: vocabulary.join(", ") }),
            [only] => Ok(Some(self.consume(state, only))),
            _ => {
                // Keep the only candidate that still lexes to the end of the input
                let mut found = None;
                for m in matches.iter() {
                    let mut trial = *state;
                    self.consume(&mut trial, m);
                    if self.lexes_to_end(trial) {
                        if found.is_some() {
                            return Err(NameError::Ambiguous { name: self.input.to_string() });
                        }
                        found = Some(*m);
                    }
                }
                match found {
                    Some(m) => Ok(Some(self.consume(state, m))),
                    None => Err(NameError::NoMatch { name: self.input.to_string() }),
                }
            }
        }
    }

    fn lexes_to_end(&self, mut state: LexerState) -> bool {
        loop {
            match self.next(&mut state) {
                Ok(Some(_)) => continue,
                Ok(None) => return true,
                Err(_) => return false,
            }
        }
    }

    fn consume(&self, state: &mut LexerState, token: &str) -> String {
        state.pos += token.len();
        if self.input.as_bytes().get(state.pos) == Some(&b'-') {
            state.pos += 1;
        }
        if state.token_type < OBJECTIVE {
            state.token_type += 1;
        }
        token.to_string()
    }
}
