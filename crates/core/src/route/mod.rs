//! Ordered mixer-control writes that establish one audio path.

mod profiles;

use std::{fmt, io, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Result, TunerError};

/// Value type of a mixer control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Boolean,
    Integer,
    Enumerated,
    /// Bytes, IEC958 and 64-bit integer controls are never written by routes.
    Other,
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Enumerated => "enumerated",
            Self::Other => "unsupported",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlValue {
    Boolean(bool),
    Integer(i64),
    /// Enumerated controls are written by item name.
    Enumerated(String),
}

impl ControlValue {
    pub fn kind(&self) -> ControlKind {
        match self {
            Self::Boolean(_) => ControlKind::Boolean,
            Self::Integer(_) => ControlKind::Integer,
            Self::Enumerated(_) => ControlKind::Enumerated,
        }
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(value) => write!(f, "{}", *value as u8),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Enumerated(item) => f.write_str(item),
        }
    }
}

/// One named control write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixerControlDescriptor {
    pub name: String,
    pub value: ControlValue,
}

impl MixerControlDescriptor {
    pub fn boolean(name: impl Into<String>, value: bool) -> Self {
        Self {
            name: name.into(),
            value: ControlValue::Boolean(value),
        }
    }

    pub fn integer(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value: ControlValue::Integer(value),
        }
    }

    pub fn enumerated(name: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: ControlValue::Enumerated(item.into()),
        }
    }

    /// Kind the resolved control must report before it is written.
    pub fn kind(&self) -> ControlKind {
        self.value.kind()
    }
}

/// Ordered descriptor list. Later entries may rely on earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSequence {
    pub name: String,
    pub controls: Vec<MixerControlDescriptor>,
}

impl ControlSequence {
    pub fn new(name: impl Into<String>, controls: Vec<MixerControlDescriptor>) -> Self {
        Self {
            name: name.into(),
            controls,
        }
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

/// Routing profile selected for a run. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteProfile {
    Headphone,
    Speaker,
    /// Tuner only; the route and stream phases are skipped.
    None,
}

impl RouteProfile {
    pub fn sequence(self) -> Option<ControlSequence> {
        match self {
            Self::Headphone => Some(profiles::headphone()),
            Self::Speaker => Some(profiles::speaker()),
            Self::None => None,
        }
    }
}

impl FromStr for RouteProfile {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "headphone" => Ok(Self::Headphone),
            "speaker" => Ok(Self::Speaker),
            "none" => Ok(Self::None),
            other => Err(format!(
                "unknown route profile `{other}` (expected headphone, speaker or none)"
            )),
        }
    }
}

/// A mixer control located by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedControl {
    pub name: String,
    pub kind: ControlKind,
    /// Number of channels the control carries.
    pub count: u32,
}

/// Mixer control transport.
pub trait MixerTransport {
    /// Looks a control up by name; `Ok(None)` when no such control exists.
    fn resolve(&mut self, name: &str) -> io::Result<Option<ResolvedControl>>;
    fn write(&mut self, control: &ResolvedControl, value: &ControlValue) -> io::Result<()>;
}

/// Writes every descriptor of `sequence` in order and returns how many were
/// applied. The first failure stops the sequence; earlier writes stay in
/// place.
pub fn apply_sequence<M: MixerTransport>(
    mixer: &mut M,
    sequence: &ControlSequence,
) -> Result<usize> {
    for (applied, descriptor) in sequence.controls.iter().enumerate() {
        let control = match mixer.resolve(&descriptor.name) {
            Ok(Some(control)) => control,
            Ok(None) => {
                return Err(TunerError::ControlNotFound {
                    control: descriptor.name.clone(),
                    applied,
                })
            }
            Err(source) => {
                return Err(TunerError::MixerTransport {
                    control: descriptor.name.clone(),
                    applied,
                    source,
                })
            }
        };

        if control.kind != descriptor.kind() {
            return Err(TunerError::UnsupportedControlKind {
                control: descriptor.name.clone(),
                expected: descriptor.kind(),
                actual: control.kind,
                applied,
            });
        }

        mixer
            .write(&control, &descriptor.value)
            .map_err(|err| TunerError::ControlWriteRejected {
                control: descriptor.name.clone(),
                reason: err.to_string(),
                applied,
            })?;

        tracing::debug!(
            route = %sequence.name,
            control = %descriptor.name,
            value = %descriptor.value,
            "mixer control applied"
        );
    }

    Ok(sequence.len())
}
