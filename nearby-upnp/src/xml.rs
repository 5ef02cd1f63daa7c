use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use tracing::debug;
use url::Url;

/// Errors aborting a parse
///
/// Grammars are strict within their own namespace: an element or
/// attribute the grammar doesn't know, or a value that doesn't
/// convert, stops the document. Elements in foreign namespaces are
/// skipped instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying reader reported a syntax problem
    #[error("XML error at line {line}, column {column}: {message}")]
    Syntax {
        /// 1-based line
        line: u64,
        /// 1-based column
        column: u64,
        /// The reader's message
        message: String,
    },

    /// An element the grammar doesn't allow in this state
    #[error(
        "unexpected element <{element}> in {state} state \
         at line {line}, column {column}"
    )]
    UnexpectedElement {
        /// The element's local name
        element: String,
        /// The state the parser was in
        state: String,
        /// 1-based line
        line: u64,
        /// 1-based column
        column: u64,
    },

    /// An attribute the grammar doesn't allow on this element
    #[error(
        "unexpected attribute {attribute} for element <{element}> \
         in {state} state at line {line}, column {column}"
    )]
    UnexpectedAttribute {
        /// The attribute's local name
        attribute: String,
        /// The element carrying it
        element: String,
        /// The state the parser was in
        state: String,
        /// 1-based line
        line: u64,
        /// 1-based column
        column: u64,
    },

    /// Text that does not convert to the declared type
    #[error(
        "invalid value {value:?} for <{element}> at line {line}, \
         column {column}: {message}"
    )]
    Conversion {
        /// The offending text
        value: String,
        /// The element (or attribute path) being assigned
        element: String,
        /// What the conversion disliked
        message: String,
        /// 1-based line
        line: u64,
        /// 1-based column
        column: u64,
    },
}

/// What a parser state must provide
pub trait State: Copy + Eq + Hash + fmt::Debug {}

impl<T: Copy + Eq + Hash + fmt::Debug> State for T {}

/// Converting element text or attribute values into field types
pub trait FromXml: Sized {
    /// Parse the raw text; the message ends up in
    /// [`Error::Conversion`]
    fn from_xml(text: &str) -> Result<Self, String>;
}

macro_rules! impl_from_xml_int {
    ($($t:ty),*) => {
        $(impl FromXml for $t {
            fn from_xml(text: &str) -> Result<Self, String> {
                text.trim()
                    .parse()
                    .map_err(|_| format!("invalid number: {text}"))
            }
        })*
    };
}

impl_from_xml_int!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! impl_from_xml_float {
    ($($t:ty),*) => {
        $(impl FromXml for $t {
            fn from_xml(text: &str) -> Result<Self, String> {
                let text = text.trim();
                let lower = text.to_ascii_lowercase();
                // NaN carries no sign worth keeping
                if lower == "+nan" || lower == "-nan" {
                    return Err(format!("invalid number: {text}"));
                }
                text.parse()
                    .map_err(|_| format!("invalid number: {text}"))
            }
        })*
    };
}

impl_from_xml_float!(f32, f64);

impl FromXml for bool {
    fn from_xml(text: &str) -> Result<Self, String> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "enabled" => Ok(true),
            "false" | "no" | "off" | "disabled" => Ok(false),
            other => match other.parse::<i64>() {
                Ok(number) => Ok(number != 0),
                Err(_) => Err(format!("invalid flag: {text}")),
            },
        }
    }
}

impl FromXml for String {
    fn from_xml(text: &str) -> Result<Self, String> {
        Ok(text.to_string())
    }
}

impl FromXml for Url {
    fn from_xml(text: &str) -> Result<Self, String> {
        Url::parse(text.trim()).map_err(|e| format!("invalid URL: {e}"))
    }
}

/// An enum value that degrades to plain text when unknown
///
/// Descriptor documents in the wild carry vendor-specific values in
/// fields that are nominally enumerations; this keeps the unknown
/// text instead of failing the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opportunistic<T> {
    /// A value the enumeration knows
    Known(T),
    /// Anything else, verbatim
    Unknown(String),
}

impl<T: FromXml> FromXml for Opportunistic<T> {
    fn from_xml(text: &str) -> Result<Self, String> {
        Ok(match T::from_xml(text) {
            Ok(value) => Opportunistic::Known(value),
            Err(_) => Opportunistic::Unknown(text.to_string()),
        })
    }
}

type AssignFn<C> = Box<dyn Fn(&mut C, &str) -> Result<(), String>>;

enum Step<S, C> {
    Transition(S),
    TransitionWith(S, fn(&mut C)),
    Assign(AssignFn<C>),
    Append(AssignFn<C>),
}

type ElementTable<S, C> = HashMap<&'static str, Step<S, C>>;
type StateTable<S, C> = HashMap<S, ElementTable<S, C>>;

/// A declarative grammar: states, steps, and exit actions
///
/// Rules are registered under a namespace URI and keyed by
/// `(state, element-local-name)`. Attribute rules use the paths
/// `element/@attribute` or `@attribute`. Exit actions run when the
/// element that entered a state ends.
pub struct Grammar<S: State, C> {
    namespaces: HashMap<&'static str, StateTable<S, C>>,
    exits: HashMap<S, fn(&mut C)>,
    current: &'static str,
}

impl<S: State, C: 'static> Grammar<S, C> {
    /// A grammar whose following rules live in `namespace`
    #[must_use]
    pub fn new(namespace: &'static str) -> Self {
        let mut namespaces = HashMap::new();
        namespaces.insert(namespace, StateTable::new());
        Self {
            namespaces,
            exits: HashMap::new(),
            current: namespace,
        }
    }

    /// Switch the namespace following rules are registered under
    #[must_use]
    pub fn namespace(mut self, namespace: &'static str) -> Self {
        self.namespaces.entry(namespace).or_default();
        self.current = namespace;
        self
    }

    fn insert(&mut self, state: S, element: &'static str, step: Step<S, C>) {
        self.namespaces
            .entry(self.current)
            .or_default()
            .entry(state)
            .or_default()
            .insert(element, step);
    }

    /// On `element` in `state`, enter `next`
    #[must_use]
    pub fn transition(
        mut self,
        state: S,
        element: &'static str,
        next: S,
    ) -> Self {
        self.insert(state, element, Step::Transition(next));
        self
    }

    /// On `element` in `state`, run `enter` and enter `next`
    ///
    /// Used to append a fresh element to a list so that the new
    /// state's assignments fill it in.
    #[must_use]
    pub fn transition_with(
        mut self,
        state: S,
        element: &'static str,
        next: S,
        enter: fn(&mut C),
    ) -> Self {
        self.insert(state, element, Step::TransitionWith(next, enter));
        self
    }

    /// On `element` in `state`, convert its text and store it
    #[must_use]
    pub fn assign<T: FromXml + 'static>(
        mut self,
        state: S,
        element: &'static str,
        set: fn(&mut C, T),
    ) -> Self {
        self.insert(
            state,
            element,
            Step::Assign(Box::new(move |context, text| {
                set(context, T::from_xml(text)?);
                Ok(())
            })),
        );
        self
    }

    /// Like assign, for elements that repeat into a list
    #[must_use]
    pub fn append<T: FromXml + 'static>(
        mut self,
        state: S,
        element: &'static str,
        push: fn(&mut C, T),
    ) -> Self {
        self.insert(
            state,
            element,
            Step::Append(Box::new(move |context, text| {
                push(context, T::from_xml(text)?);
                Ok(())
            })),
        );
        self
    }

    /// A boolean-ish assignment where element presence means true
    ///
    /// `<Optional/>` and friends: empty text sets the flag, anything
    /// else must parse as a boolean.
    #[must_use]
    pub fn flag(
        mut self,
        state: S,
        element: &'static str,
        set: fn(&mut C, bool),
    ) -> Self {
        self.insert(
            state,
            element,
            Step::Assign(Box::new(move |context, text| {
                if text.trim().is_empty() {
                    set(context, true);
                } else {
                    set(context, bool::from_xml(text)?);
                }
                Ok(())
            })),
        );
        self
    }

    /// Run `exit` when the element that entered `state` ends
    #[must_use]
    pub fn on_exit(mut self, state: S, exit: fn(&mut C)) -> Self {
        self.exits.insert(state, exit);
        self
    }
}

fn line_col(input: &[u8], position: usize) -> (u64, u64) {
    let upto = &input[..position.min(input.len())];
    let line = upto.iter().filter(|b| **b == b'\n').count() as u64 + 1;
    let column =
        upto.iter().rev().take_while(|b| **b != b'\n').count() as u64 + 1;
    (line, column)
}

struct Driver<'i, S: State, C> {
    input: &'i [u8],
    reader: NsReader<&'i [u8]>,
    grammar: &'i Grammar<S, C>,
    stack: Vec<S>,
}

/// Run a grammar over a document, filling `context`
///
/// # Errors
///
/// Returns the first [`Error`] encountered; the context may be
/// partially filled and should be discarded.
pub fn parse_document<S: State, C>(
    input: &[u8],
    initial: S,
    grammar: &Grammar<S, C>,
    context: &mut C,
) -> Result<(), Error> {
    let mut driver = Driver {
        input,
        reader: NsReader::from_reader(input),
        grammar,
        stack: vec![initial],
    };
    driver.run(context)
}

impl<'i, S: State, C> Driver<'i, S, C> {
    fn position(&self) -> (u64, u64) {
        line_col(self.input, self.reader.buffer_position())
    }

    fn syntax_error(&self, message: impl fmt::Display) -> Error {
        let (line, column) = self.position();
        Error::Syntax {
            line,
            column,
            message: message.to_string(),
        }
    }

    fn state(&self) -> S {
        *self.stack.last().expect("parse stack is never empty")
    }

    fn run(&mut self, context: &mut C) -> Result<(), Error> {
        loop {
            let (namespace, event) = match self.reader.read_resolved_event()
            {
                Ok((resolve, event)) => (resolve_uri(&resolve), event),
                Err(e) => return Err(self.syntax_error(e)),
            };
            match event {
                Event::Start(start) => {
                    self.handle_element(context, &namespace, &start, false)?;
                }
                Event::Empty(start) => {
                    self.handle_element(context, &namespace, &start, true)?;
                }
                Event::End(_) => {
                    if self.stack.len() > 1 {
                        let left = self.stack.pop();
                        if let Some(exit) = left
                            .and_then(|state| self.grammar.exits.get(&state))
                        {
                            exit(context);
                        }
                    }
                }
                Event::Eof => return Ok(()),
                _ => {}
            }
        }
    }

    fn handle_element(
        &mut self,
        context: &mut C,
        namespace: &Option<String>,
        start: &BytesStart<'i>,
        empty: bool,
    ) -> Result<(), Error> {
        let grammar = self.grammar;
        let tables = namespace
            .as_deref()
            .and_then(|uri| grammar.namespaces.get(uri));
        let Some(tables) = tables else {
            debug!(
                "ignoring element {:?} in foreign namespace {:?}",
                String::from_utf8_lossy(start.name().as_ref()),
                namespace,
            );
            if !empty {
                self.reader
                    .read_to_end(start.name())
                    .map_err(|e| self.syntax_error(e))?;
            }
            return Ok(());
        };

        let state = self.state();
        let element =
            String::from_utf8_lossy(start.local_name().as_ref()).to_string();

        let step = tables.get(&state).and_then(|t| t.get(element.as_str()));
        match step {
            None => {
                let (line, column) = self.position();
                Err(Error::UnexpectedElement {
                    element,
                    state: format!("{state:?}"),
                    line,
                    column,
                })
            }
            Some(Step::Transition(next)) => {
                let next = *next;
                self.handle_attributes(context, tables, next, &element, start)?;
                self.enter(context, next, empty);
                Ok(())
            }
            Some(Step::TransitionWith(next, enter)) => {
                let next = *next;
                enter(context);
                self.handle_attributes(context, tables, next, &element, start)?;
                self.enter(context, next, empty);
                Ok(())
            }
            Some(Step::Assign(f) | Step::Append(f)) => {
                self.handle_attributes(
                    context, tables, state, &element, start,
                )?;
                let text = if empty {
                    String::new()
                } else {
                    self.read_element_text(&element, state)?
                };
                f(context, &text).map_err(|message| {
                    let (line, column) = self.position();
                    Error::Conversion {
                        value: text,
                        element: element.clone(),
                        message,
                        line,
                        column,
                    }
                })
            }
        }
    }

    fn enter(&mut self, context: &mut C, next: S, empty: bool) {
        if empty {
            // an empty element enters and leaves in one event
            if let Some(exit) = self.grammar.exits.get(&next) {
                exit(context);
            }
        } else {
            self.stack.push(next);
        }
    }

    fn handle_attributes(
        &self,
        context: &mut C,
        tables: &StateTable<S, C>,
        state: S,
        element: &str,
        start: &BytesStart<'i>,
    ) -> Result<(), Error> {
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| self.syntax_error(e))?;
            let key = attribute.key.as_ref();
            if key == b"xmlns" || key.starts_with(b"xmlns:") {
                continue;
            }

            let (resolve, local) =
                self.reader.resolve_attribute(attribute.key);
            if let ResolveResult::Bound(bound) = &resolve {
                let uri = String::from_utf8_lossy(bound.as_ref());
                if !self.grammar.namespaces.contains_key(uri.as_ref()) {
                    debug!("ignoring attribute in foreign namespace {uri:?}");
                    continue;
                }
            } else if matches!(resolve, ResolveResult::Unknown(_)) {
                continue;
            }

            let name = String::from_utf8_lossy(local.as_ref()).to_string();
            let full_path = format!("{element}/@{name}");
            let short_path = format!("@{name}");
            let step = tables.get(&state).and_then(|t| {
                t.get(full_path.as_str()).or_else(|| t.get(short_path.as_str()))
            });

            match step {
                Some(Step::Assign(f) | Step::Append(f)) => {
                    let value = attribute
                        .unescape_value()
                        .map_err(|e| self.syntax_error(e))?;
                    f(context, &value).map_err(|message| {
                        let (line, column) = self.position();
                        Error::Conversion {
                            value: value.to_string(),
                            element: full_path.clone(),
                            message,
                            line,
                            column,
                        }
                    })?;
                }
                _ => {
                    let (line, column) = self.position();
                    return Err(Error::UnexpectedAttribute {
                        attribute: name,
                        element: element.to_string(),
                        state: format!("{state:?}"),
                        line,
                        column,
                    });
                }
            }
        }
        Ok(())
    }

    fn read_element_text(
        &mut self,
        element: &str,
        state: S,
    ) -> Result<String, Error> {
        let mut text = String::new();
        loop {
            match self.reader.read_resolved_event() {
                Err(e) => return Err(self.syntax_error(e)),
                Ok((_, Event::Text(t))) => {
                    text.push_str(&t.unescape().map_err(|e| self.syntax_error(e))?);
                }
                Ok((_, Event::CData(c))) => {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
                Ok((_, Event::End(_))) => return Ok(text),
                Ok((_, Event::Start(child) | Event::Empty(child))) => {
                    let (line, column) = self.position();
                    return Err(Error::UnexpectedElement {
                        element: format!(
                            "{element}/{}",
                            String::from_utf8_lossy(
                                child.local_name().as_ref()
                            )
                        ),
                        state: format!("{state:?}"),
                        line,
                        column,
                    });
                }
                Ok((_, Event::Eof)) => {
                    return Err(
                        self.syntax_error("premature end of document")
                    );
                }
                _ => {}
            }
        }
    }
}

fn resolve_uri(resolve: &ResolveResult) -> Option<String> {
    match resolve {
        ResolveResult::Bound(namespace) => {
            Some(String::from_utf8_lossy(namespace.as_ref()).to_string())
        }
        _ => None,
    }
}
