use self::Ctl::{Bool, Enum, Int};
use crate::{ControlSequence, MixerControlDescriptor};

enum Ctl {
    Bool(&'static str, bool),
    Int(&'static str, i64),
    Enum(&'static str, &'static str),
}

const HEADPHONE_PATH: &[Ctl] = &[
    Enum("SLIM RX1 MUX", "AIF1_PB"),
    Enum("SLIM RX2 MUX", "AIF1_PB"),
    Enum("SLIM_0_RX Channels", "Two"),
    Enum("RX1 MIX1 INP1", "RX1"),
    Enum("RX2 MIX1 INP1", "RX2"),
    Enum("CLASS_H_DSM MUX", "DSM_HPHL_RX1"),
    Bool("HPHL DAC Switch", true),
    Bool("COMP0 Switch", true),
    // 100% of the 20-step headphone amplifier range.
    Int("HPHL Volume", 20),
    Int("HPHR Volume", 20),
    // 60% of 124.
    Int("RX1 Digital Volume", 76),
    Int("RX2 Digital Volume", 76),
];

const SPEAKER_PATH: &[Ctl] = &[
    Bool("AIF4_VI Mixer SPKR_VI_1", true),
    Bool("AIF4_VI Mixer SPKR_VI_2", true),
    Enum("SLIM RX1 MUX", "AIF1_PB"),
    Enum("SLIM RX2 MUX", "AIF1_PB"),
    Enum("SLIM_0_RX Channels", "Two"),
    Enum("RX7 MIX1 INP1", "RX1"),
    Enum("RX8 MIX1 INP1", "RX2"),
    Int("RX7 Digital Volume", 84),
    Int("RX8 Digital Volume", 84),
    Bool("COMP0 Switch", true),
    Enum("VI_FEED_TX Channels", "Two"),
    Enum("SLIM0_RX_VI_FB_LCH_MUX", "SLIM4_TX"),
    Enum("SLIM0_RX_VI_FB_RCH_MUX", "SLIM4_TX"),
];

/// Routes the tuner's I2S capture into the SLIMbus playback back end. Applied
/// after either output path.
const FM_LOOPBACK: &[Ctl] = &[
    Bool("SLIMBUS_0_RX Audio Mixer MultiMedia4", true),
    Enum("SLIM_0_RX Format", "S16_LE"),
    Enum("SLIM_0_RX SampleRate", "KHZ_48"),
    Bool("SLIMBUS_0_RX Port Mixer PRI_MI2S_TX", true),
    Bool("SLIMBUS_DL_HL Switch", true),
    Bool("MultiMedia1 Mixer PRI_MI2S_TX", true),
    Bool("MultiMedia2 Mixer PRI_MI2S_TX", true),
    Int("PRI MI2S LOOPBACK Volume", 421),
];

pub(super) fn headphone() -> ControlSequence {
    build("headphone", &[HEADPHONE_PATH, FM_LOOPBACK])
}

pub(super) fn speaker() -> ControlSequence {
    build("speaker", &[SPEAKER_PATH, FM_LOOPBACK])
}

fn build(name: &str, tables: &[&[Ctl]]) -> ControlSequence {
    let controls = tables
        .iter()
        .flat_map(|table| table.iter())
        .map(|ctl| match *ctl {
            Bool(name, value) => MixerControlDescriptor::boolean(name, value),
            Int(name, value) => MixerControlDescriptor::integer(name, value),
            Enum(name, item) => MixerControlDescriptor::enumerated(name, item),
        })
        .collect();
    ControlSequence::new(name, controls)
}
