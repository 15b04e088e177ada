//! V4L2 radio tuner access through raw ioctls.

use std::{
    fs::{File, OpenOptions},
    io,
    os::fd::{AsRawFd, IntoRawFd},
};

use crate::{
    DeviceCapability, SeekDirection, StereoMode, TunerControl, TunerDevice, TunerStatus,
    TunerTransport,
};

const V4L2_CAP_HW_FREQ_SEEK: u32 = 0x0000_0400;
const V4L2_CAP_TUNER: u32 = 0x0001_0000;
const V4L2_CAP_RADIO: u32 = 0x0004_0000;
const V4L2_CAP_DEVICE_CAPS: u32 = 0x8000_0000;

const V4L2_TUNER_RADIO: u32 = 1;
const V4L2_TUNER_CAP_LOW: u32 = 0x0001;
const V4L2_TUNER_CAP_STEREO: u32 = 0x0010;
const V4L2_TUNER_CAP_1HZ: u32 = 0x1000;
const V4L2_TUNER_SUB_STEREO: u32 = 0x0002;
const V4L2_TUNER_MODE_MONO: u32 = 0;
const V4L2_TUNER_MODE_STEREO: u32 = 1;

const V4L2_CID_BASE: u32 = 0x0098_0900;
const V4L2_CID_AUDIO_VOLUME: u32 = V4L2_CID_BASE + 5;
const V4L2_CID_AUDIO_MUTE: u32 = V4L2_CID_BASE + 9;

#[repr(C)]
pub struct Capability {
    driver: [u8; 16],
    card: [u8; 32],
    bus_info: [u8; 32],
    version: u32,
    capabilities: u32,
    device_caps: u32,
    reserved: [u32; 3],
}

#[repr(C)]
pub struct Tuner {
    index: u32,
    name: [u8; 32],
    kind: u32,
    capability: u32,
    rangelow: u32,
    rangehigh: u32,
    rxsubchans: u32,
    audmode: u32,
    signal: i32,
    afc: i32,
    reserved: [u32; 4],
}

#[repr(C)]
pub struct Frequency {
    tuner: u32,
    kind: u32,
    frequency: u32,
    reserved: [u32; 8],
}

#[repr(C)]
pub struct Control {
    id: u32,
    value: i32,
}

#[repr(C)]
pub struct HwFreqSeek {
    tuner: u32,
    kind: u32,
    seek_upward: u32,
    wrap_around: u32,
    spacing: u32,
    rangelow: u32,
    rangehigh: u32,
    reserved: [u32; 5],
}

nix::ioctl_read!(vidioc_querycap, b'V', 0, Capability);
nix::ioctl_readwrite!(vidioc_s_ctrl, b'V', 28, Control);
nix::ioctl_readwrite!(vidioc_g_tuner, b'V', 29, Tuner);
nix::ioctl_write_ptr!(vidioc_s_tuner, b'V', 30, Tuner);
nix::ioctl_readwrite!(vidioc_g_frequency, b'V', 56, Frequency);
nix::ioctl_write_ptr!(vidioc_s_frequency, b'V', 57, Frequency);
nix::ioctl_write_ptr!(vidioc_s_hw_freq_seek, b'V', 82, HwFreqSeek);

/// Opens `/dev/radioN` nodes.
#[derive(Debug, Default)]
pub struct V4l2Transport;

impl TunerTransport for V4l2Transport {
    type Device = V4l2Radio;

    fn open(&mut self, path: &str) -> io::Result<V4l2Radio> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(V4l2Radio { file: Some(file) })
    }
}

/// An opened V4L2 radio, always addressed as tuner 0.
#[derive(Debug)]
pub struct V4l2Radio {
    file: Option<File>,
}

impl V4l2Radio {
    fn fd(&self) -> io::Result<i32> {
        self.file
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "radio device closed"))
    }

    fn g_tuner(&self) -> io::Result<Tuner> {
        let fd = self.fd()?;
        // SAFETY: Tuner is plain old data; all-zero is a valid value.
        let mut tuner: Tuner = unsafe { std::mem::zeroed() };
        tuner.index = 0;
        unsafe { vidioc_g_tuner(fd, &mut tuner) }?;
        Ok(tuner)
    }
}

impl TunerDevice for V4l2Radio {
    fn query_capability(&mut self) -> io::Result<DeviceCapability> {
        let fd = self.fd()?;
        // SAFETY: Capability is plain old data; all-zero is a valid value.
        let mut cap: Capability = unsafe { std::mem::zeroed() };
        unsafe { vidioc_querycap(fd, &mut cap) }?;

        let caps = if cap.capabilities & V4L2_CAP_DEVICE_CAPS != 0 {
            cap.device_caps
        } else {
            cap.capabilities
        };
        Ok(DeviceCapability {
            driver: c_string(&cap.driver),
            card: c_string(&cap.card),
            is_radio_tuner: caps & V4L2_CAP_TUNER != 0 && caps & V4L2_CAP_RADIO != 0,
            hw_seek: caps & V4L2_CAP_HW_FREQ_SEEK != 0,
        })
    }

    fn tuner_status(&mut self) -> io::Result<TunerStatus> {
        let tuner = self.g_tuner()?;
        let (unit_multiplier, unit_divisor) = native_unit(tuner.capability);
        Ok(TunerStatus {
            range_low: tuner.rangelow,
            range_high: tuner.rangehigh,
            unit_multiplier,
            unit_divisor,
            stereo_capable: tuner.capability & V4L2_TUNER_CAP_STEREO != 0,
            receiving_stereo: tuner.rxsubchans & V4L2_TUNER_SUB_STEREO != 0,
            mode: if tuner.audmode == V4L2_TUNER_MODE_STEREO {
                StereoMode::Stereo
            } else {
                StereoMode::Mono
            },
            signal: tuner.signal.clamp(0, u16::MAX as i32) as u16,
        })
    }

    fn set_audio_mode(&mut self, mode: StereoMode) -> io::Result<()> {
        let mut tuner = self.g_tuner()?;
        tuner.audmode = match mode {
            StereoMode::Mono => V4L2_TUNER_MODE_MONO,
            StereoMode::Stereo => V4L2_TUNER_MODE_STEREO,
        };
        unsafe { vidioc_s_tuner(self.fd()?, &tuner) }?;
        Ok(())
    }

    fn set_frequency(&mut self, native: u32) -> io::Result<()> {
        let frequency = Frequency {
            tuner: 0,
            kind: V4L2_TUNER_RADIO,
            frequency: native,
            reserved: [0; 8],
        };
        unsafe { vidioc_s_frequency(self.fd()?, &frequency) }?;
        Ok(())
    }

    fn frequency(&mut self) -> io::Result<u32> {
        let mut frequency = Frequency {
            tuner: 0,
            kind: V4L2_TUNER_RADIO,
            frequency: 0,
            reserved: [0; 8],
        };
        unsafe { vidioc_g_frequency(self.fd()?, &mut frequency) }?;
        Ok(frequency.frequency)
    }

    fn set_control(&mut self, control: TunerControl, value: i32) -> io::Result<()> {
        let mut ctrl = Control {
            id: match control {
                TunerControl::Volume => V4L2_CID_AUDIO_VOLUME,
                TunerControl::Mute => V4L2_CID_AUDIO_MUTE,
            },
            value,
        };
        unsafe { vidioc_s_ctrl(self.fd()?, &mut ctrl) }?;
        Ok(())
    }

    fn seek(&mut self, direction: SeekDirection, wrap_around: bool) -> io::Result<()> {
        let seek = HwFreqSeek {
            tuner: 0,
            kind: V4L2_TUNER_RADIO,
            seek_upward: (direction == SeekDirection::Up) as u32,
            wrap_around: wrap_around as u32,
            spacing: 0,
            rangelow: 0,
            rangehigh: 0,
            reserved: [0; 5],
        };
        unsafe { vidioc_s_hw_freq_seek(self.fd()?, &seek) }?;
        Ok(())
    }

    /// Releases the descriptor and reports a failing `close(2)`. Closing an
    /// already closed radio is a no-op.
    fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(file) => nix::unistd::close(file.into_raw_fd()).map_err(io::Error::from),
            None => Ok(()),
        }
    }
}

/// Native tuning step as a multiplier/divisor pair in Hz.
fn native_unit(capability: u32) -> (u32, u32) {
    if capability & V4L2_TUNER_CAP_1HZ != 0 {
        (1, 1)
    } else if capability & V4L2_TUNER_CAP_LOW != 0 {
        (125, 2)
    } else {
        (62_500, 1)
    }
}

fn c_string(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
