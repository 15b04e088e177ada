//! ALSA control-device access for mixer routing.

use std::{ffi::CString, io};

use alsa::{
    ctl::{ElemId, ElemIface, ElemType, ElemValue},
    hctl::HCtl,
    mixer::{Mixer, SelemId},
};

use super::alsa_error;
use crate::{ControlKind, ControlValue, MixerTransport, ResolvedControl};

/// Mixer controls of ALSA card `hw:<card>`. The card is opened on first use
/// so that tuner-only runs never touch it.
pub struct AlsaMixer {
    card: u32,
    hctl: Option<HCtl>,
    selems: Option<Mixer>,
}

impl AlsaMixer {
    pub fn new(card: u32) -> Self {
        Self {
            card,
            hctl: None,
            selems: None,
        }
    }

    fn device(&self) -> String {
        format!("hw:{}", self.card)
    }

    fn hctl(&mut self) -> io::Result<&HCtl> {
        if self.hctl.is_none() {
            let device = self.device();
            let hctl = HCtl::new(&device, false).map_err(|err| alsa_error(&device, err))?;
            hctl.load().map_err(|err| alsa_error(&device, err))?;
            self.hctl = Some(hctl);
        }
        self.hctl
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "mixer closed"))
    }

    /// Finds the item index of an enumerated control by item name.
    fn enum_item(&mut self, control: &str, wanted: &str) -> io::Result<u32> {
        if self.selems.is_none() {
            let device = self.device();
            let mixer = Mixer::new(&device, false).map_err(|err| alsa_error(&device, err))?;
            self.selems = Some(mixer);
        }
        let selem = self
            .selems
            .as_ref()
            .and_then(|mixer| mixer.find_selem(&SelemId::new(control, 0)))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no enumerated element `{control}`"),
                )
            })?;

        for (index, item) in selem
            .iter_enum()
            .map_err(|err| alsa_error(control, err))?
            .enumerate()
        {
            if item.map_err(|err| alsa_error(control, err))? == wanted {
                return u32::try_from(index)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err));
            }
        }
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("no enumerated item `{wanted}`"),
        ))
    }
}

impl std::fmt::Debug for AlsaMixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlsaMixer")
            .field("card", &self.card)
            .field("open", &self.hctl.is_some())
            .finish()
    }
}

impl MixerTransport for AlsaMixer {
    fn resolve(&mut self, name: &str) -> io::Result<Option<ResolvedControl>> {
        let Some(id) = mixer_id(name) else {
            return Ok(None);
        };

        let hctl = self.hctl()?;
        let Some(elem) = hctl.find_elem(&id) else {
            return Ok(None);
        };
        let info = elem.info().map_err(|err| alsa_error(name, err))?;

        Ok(Some(ResolvedControl {
            name: name.to_string(),
            kind: control_kind(info.get_type()),
            count: info.get_count(),
        }))
    }

    fn write(&mut self, control: &ResolvedControl, value: &ControlValue) -> io::Result<()> {
        let item = match value {
            ControlValue::Enumerated(wanted) => Some(self.enum_item(&control.name, wanted)?),
            _ => None,
        };

        let id = mixer_id(&control.name).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "control name contains NUL")
        })?;
        let hctl = self.hctl()?;
        let elem = hctl.find_elem(&id).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("`{}` disappeared", control.name),
            )
        })?;

        let mut current = elem.read().map_err(|err| alsa_error(&control.name, err))?;
        fill_channels(&mut current, control.count, value, item)?;
        elem.write(&current).map_err(|err| alsa_error(&control.name, err))?;
        Ok(())
    }
}

/// Writes `value` into every channel of the control.
fn fill_channels(
    elem: &mut ElemValue,
    count: u32,
    value: &ControlValue,
    item: Option<u32>,
) -> io::Result<()> {
    let rejected = || io::Error::new(io::ErrorKind::InvalidInput, "channel out of range");
    for channel in 0..count.max(1) {
        let written = match value {
            ControlValue::Boolean(on) => elem.set_boolean(channel, *on),
            ControlValue::Integer(level) => {
                let level = i32::try_from(*level)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
                elem.set_integer(channel, level)
            }
            ControlValue::Enumerated(_) => {
                elem.set_enumerated(channel, item.ok_or_else(rejected)?)
            }
        };
        written.ok_or_else(rejected)?;
    }
    Ok(())
}

fn control_kind(kind: ElemType) -> ControlKind {
    match kind {
        ElemType::Boolean => ControlKind::Boolean,
        ElemType::Integer => ControlKind::Integer,
        ElemType::Enumerated => ControlKind::Enumerated,
        _ => ControlKind::Other,
    }
}

/// Builds a by-name lookup id on the mixer interface. Names with an embedded
/// NUL cannot exist.
fn mixer_id(name: &str) -> Option<ElemId> {
    let name = CString::new(name).ok()?;
    let mut id = ElemId::new(ElemIface::Mixer);
    id.set_name(&name);
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_types_map_to_control_kinds() {
        assert_eq!(control_kind(ElemType::Boolean), ControlKind::Boolean);
        assert_eq!(control_kind(ElemType::Integer), ControlKind::Integer);
        assert_eq!(control_kind(ElemType::Enumerated), ControlKind::Enumerated);
        assert_eq!(control_kind(ElemType::Bytes), ControlKind::Other);
    }

    #[test]
    fn lookup_ids_target_the_mixer_interface() {
        let id = mixer_id("HPHL Volume").unwrap();
        assert_eq!(id.get_interface(), ElemIface::Mixer);
        assert_eq!(id.get_name().unwrap(), "HPHL Volume");
    }

    #[test]
    fn names_with_nul_never_resolve() {
        assert!(mixer_id("HPHL\0Volume").is_none());
        let mut mixer = AlsaMixer::new(99);
        assert!(mixer.resolve("HPHL\0Volume").unwrap().is_none());
    }

    #[test]
    fn missing_card_is_a_transport_error() {
        let mut mixer = AlsaMixer::new(99);
        let err = mixer.resolve("COMP0 Switch").unwrap_err();
        assert!(err.to_string().contains("hw:99"));
    }
}
