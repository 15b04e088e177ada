//! Kernel transports: V4L2 for the tuner, ALSA control and PCM devices for
//! the audio path.

use std::io;

mod mixer;
mod pcm;
mod v4l2;

pub use mixer::AlsaMixer;
pub use pcm::{PcmStream, PcmTransport};
pub use v4l2::{V4l2Radio, V4l2Transport};

/// Keeps the errno kind of an ALSA failure and names what failed.
fn alsa_error(context: &str, err: alsa::Error) -> io::Error {
    io::Error::new(
        io::Error::from_raw_os_error(err.errno()).kind(),
        format!("{context}: {err}"),
    )
}
