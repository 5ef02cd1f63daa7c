use crate::device::SpecVersion;
use crate::xml::{self, FromXml, Grammar, Opportunistic};
use bitflags::bitflags;

/// The namespace of UPnP service description (SCPD) documents
pub const SERVICE_NAMESPACE: &str = "urn:schemas-upnp-org:service-1-0";

/// Which way an action argument flows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    /// Towards the service
    Input,

    /// Back from the service
    #[default]
    Output,
}

impl FromXml for Direction {
    fn from_xml(text: &str) -> Result<Self, String> {
        match text.trim() {
            "in" => Ok(Direction::Input),
            "out" => Ok(Direction::Output),
            other => Err(format!("invalid direction: {other}")),
        }
    }
}

/// The declared type of a state variable
///
/// The names are the UPnP data type tokens; `number` is an alias
/// for r8 in the UPnP specification and maps to [`DataType::Double`]
/// here too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)] // the UPnP tokens say it all
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int,
    Float,
    Double,
    Fixed,
    Char,
    String,
    Date,
    DateTime,
    LocalDateTime,
    Time,
    LocalTime,
    Bool,
    Uri,
    Uuid,
    Base64,
    BinHex,
}

impl FromXml for DataType {
    fn from_xml(text: &str) -> Result<Self, String> {
        match text.trim() {
            "i1" => Ok(DataType::Int8),
            "i2" => Ok(DataType::Int16),
            "i4" => Ok(DataType::Int32),
            "i8" => Ok(DataType::Int64),
            "ui1" => Ok(DataType::UInt8),
            "ui2" => Ok(DataType::UInt16),
            "ui4" => Ok(DataType::UInt32),
            "ui8" => Ok(DataType::UInt64),
            "int" => Ok(DataType::Int),
            "r4" => Ok(DataType::Float),
            "r8" | "number" => Ok(DataType::Double),
            "fixed.14.4" => Ok(DataType::Fixed),
            "char" => Ok(DataType::Char),
            "string" => Ok(DataType::String),
            "date" => Ok(DataType::Date),
            "datetime" => Ok(DataType::DateTime),
            "datetime.tz" => Ok(DataType::LocalDateTime),
            "time" => Ok(DataType::Time),
            "time.tz" => Ok(DataType::LocalTime),
            "boolean" => Ok(DataType::Bool),
            "uri" => Ok(DataType::Uri),
            "uuid" => Ok(DataType::Uuid),
            "bin.base64" => Ok(DataType::Base64),
            "bin.hex" => Ok(DataType::BinHex),
            other => Err(format!("invalid data type: {other}")),
        }
    }
}

bitflags! {
    /// Flags on an action
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ActionFlags: u32 {
        #[doc = "The action is optional for this service type"]
        const OPTIONAL = 1 << 0;
    }
}

bitflags! {
    /// Flags on an action argument
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ArgumentFlags: u32 {
        #[doc = "The argument carries the action's return value"]
        const RETURN_VALUE = 1 << 0;
    }
}

bitflags! {
    /// Flags on a state variable
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StateVariableFlags: u32 {
        #[doc = "Changes are sent to event subscribers"]
        const SEND_EVENTS = 1 << 0;
    }
}

/// One argument of an action
#[derive(Debug, Clone, Default)]
pub struct ArgumentDescription {
    /// The argument's name
    pub name: String,

    /// Input or output
    pub direction: Direction,

    /// Return-value marker
    pub flags: ArgumentFlags,

    /// Which state variable describes the argument's type
    pub state_variable: String,
}

/// One action a service offers
#[derive(Debug, Clone, Default)]
pub struct ActionDescription {
    /// The action's name
    pub name: String,

    /// Optional marker
    pub flags: ActionFlags,

    /// The action's arguments, in declaration order
    pub arguments: Vec<ArgumentDescription>,
}

/// The allowed numeric range of a state variable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueRange {
    /// Lowest allowed value
    pub minimum: i64,

    /// Highest allowed value
    pub maximum: i64,

    /// Granularity between allowed values
    pub step: i64,
}

/// One state variable of a service
#[derive(Debug, Clone, Default)]
pub struct StateVariableDescription {
    /// The variable's name
    pub name: String,

    /// Eventing marker
    pub flags: StateVariableFlags,

    /// The declared data type; unknown tokens are kept as text
    pub data_type: Option<Opportunistic<DataType>>,

    /// The default value, verbatim
    pub default_value: String,

    /// Allowed values for string-typed variables
    pub allowed_values: Vec<String>,

    /// Allowed range for numeric variables
    pub value_range: ValueRange,
}

/// A decoded SCPD document: what a service can do
#[derive(Debug, Clone, Default)]
pub struct ControlPointDescription {
    /// The document's UPnP spec version
    pub spec_version: SpecVersion,

    /// The service's actions
    pub actions: Vec<ActionDescription>,

    /// The service's state variables
    pub state_variables: Vec<StateVariableDescription>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ScpdState {
    Document,
    Root,
    SpecVersion,
    ActionList,
    Action,
    ArgumentList,
    Argument,
    ServiceStateTable,
    StateVariable,
    AllowedValueList,
    AllowedValueRange,
}

fn argument(c: &mut ControlPointDescription) -> Option<&mut ArgumentDescription> {
    c.actions.last_mut().and_then(|a| a.arguments.last_mut())
}

fn variable(
    c: &mut ControlPointDescription,
) -> Option<&mut StateVariableDescription> {
    c.state_variables.last_mut()
}

fn grammar() -> Grammar<ScpdState, ControlPointDescription> {
    use ControlPointDescription as C;
    use ScpdState as S;

    Grammar::new(SERVICE_NAMESPACE)
        .transition(S::Document, "scpd", S::Root)
        .transition(S::Root, "specVersion", S::SpecVersion)
        .transition(S::Root, "actionList", S::ActionList)
        .transition(S::Root, "serviceStateTable", S::ServiceStateTable)
        .assign(S::SpecVersion, "major", |c: &mut C, v| {
            c.spec_version.major = v;
        })
        .assign(S::SpecVersion, "minor", |c: &mut C, v| {
            c.spec_version.minor = v;
        })
        .transition_with(S::ActionList, "action", S::Action, |c: &mut C| {
            c.actions.push(ActionDescription::default());
        })
        .assign(S::Action, "name", |c: &mut C, v| {
            if let Some(action) = c.actions.last_mut() {
                action.name = v;
            }
        })
        .transition(S::Action, "argumentList", S::ArgumentList)
        .flag(S::Action, "Optional", |c: &mut C, v| {
            if let Some(action) = c.actions.last_mut() {
                action.flags.set(ActionFlags::OPTIONAL, v);
            }
        })
        .transition_with(
            S::ArgumentList,
            "argument",
            S::Argument,
            |c: &mut C| {
                if let Some(action) = c.actions.last_mut() {
                    action.arguments.push(ArgumentDescription::default());
                }
            },
        )
        .assign(S::Argument, "name", |c: &mut C, v| {
            if let Some(argument) = argument(c) {
                argument.name = v;
            }
        })
        .assign(S::Argument, "direction", |c: &mut C, v| {
            if let Some(argument) = argument(c) {
                argument.direction = v;
            }
        })
        .flag(S::Argument, "retval", |c: &mut C, v| {
            if let Some(argument) = argument(c) {
                argument.flags.set(ArgumentFlags::RETURN_VALUE, v);
            }
        })
        .assign(S::Argument, "relatedStateVariable", |c: &mut C, v| {
            if let Some(argument) = argument(c) {
                argument.state_variable = v;
            }
        })
        .transition_with(
            S::ServiceStateTable,
            "stateVariable",
            S::StateVariable,
            |c: &mut C| {
                c.state_variables.push(StateVariableDescription::default());
            },
        )
        .assign(S::StateVariable, "name", |c: &mut C, v| {
            if let Some(variable) = variable(c) {
                variable.name = v;
            }
        })
        .assign(S::StateVariable, "dataType", |c: &mut C, v| {
            if let Some(variable) = variable(c) {
                variable.data_type = Some(v);
            }
        })
        .assign(S::StateVariable, "defaultValue", |c: &mut C, v| {
            if let Some(variable) = variable(c) {
                variable.default_value = v;
            }
        })
        .transition(S::StateVariable, "allowedValueList", S::AllowedValueList)
        .transition(
            S::StateVariable,
            "allowedValueRange",
            S::AllowedValueRange,
        )
        .flag(S::StateVariable, "@sendEvents", |c: &mut C, v| {
            if let Some(variable) = variable(c) {
                variable.flags.set(StateVariableFlags::SEND_EVENTS, v);
            }
        })
        .append(
            S::AllowedValueList,
            "allowedValue",
            |c: &mut C, v: String| {
                if let Some(variable) = variable(c) {
                    variable.allowed_values.push(v);
                }
            },
        )
        .assign(S::AllowedValueRange, "minimum", |c: &mut C, v| {
            if let Some(variable) = variable(c) {
                variable.value_range.minimum = v;
            }
        })
        .assign(S::AllowedValueRange, "maximum", |c: &mut C, v| {
            if let Some(variable) = variable(c) {
                variable.value_range.maximum = v;
            }
        })
        .assign(S::AllowedValueRange, "step", |c: &mut C, v| {
            if let Some(variable) = variable(c) {
                variable.value_range.step = v;
            }
        })
}

impl ControlPointDescription {
    /// Decode an SCPD document
    ///
    /// # Errors
    ///
    /// Returns the grammar or syntax [`xml::Error`] that stopped
    /// the document.
    pub fn parse(input: &[u8]) -> Result<ControlPointDescription, xml::Error> {
        let mut description = ControlPointDescription::default();
        xml::parse_document(
            input,
            ScpdState::Document,
            &grammar(),
            &mut description,
        )?;
        Ok(description)
    }
}
