//! Hardware volume knobs.
//!
//! Maps rotary encoder events from the controller box onto mixer operations
//! and lights each encoder according to the state of its target.

pub mod protocol;

pub use protocol::{DeviceMessage, HostCommand, LedColor, ProtocolError};

use crate::audio::{AudioEndpoint, AudioResult, Mixer, ProcessTable, Target};
use crate::config::EncoderBinding;
use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};

/// Applies controller events to a mixer.
pub struct KnobController {
    bindings: Vec<EncoderBinding>,
}

impl KnobController {
    /// Encoder `n` controls `bindings[n]`.
    pub fn new(bindings: Vec<EncoderBinding>) -> Self {
        Self { bindings }
    }

    fn binding(&self, encoder: u8) -> Option<&EncoderBinding> {
        self.bindings.get(encoder as usize)
    }

    /// Handle one message, returning the commands to send back.
    pub fn handle<D: AudioEndpoint, P: ProcessTable>(
        &self,
        mixer: &Mixer<D, P>,
        message: &DeviceMessage,
    ) -> AudioResult<Vec<HostCommand>> {
        match *message {
            DeviceMessage::Ready => {
                info!("Controller ready");
                self.refresh(mixer)
            }
            DeviceMessage::Rotated { encoder, delta } => {
                let Some(binding) = self.binding(encoder) else {
                    debug!(encoder, "Rotation on unbound encoder");
                    return Ok(Vec::new());
                };
                let change = i32::from(delta).saturating_mul(binding.step);
                let volume = mixer.change_volume(&binding.target, change)?;
                debug!(encoder, target = %binding.target, ?volume, "Volume changed");
                self.feedback(mixer, encoder, &binding.target)
            }
            DeviceMessage::Button { encoder, pressed } => {
                let Some(binding) = self.binding(encoder) else {
                    debug!(encoder, "Button on unbound encoder");
                    return Ok(Vec::new());
                };
                if !pressed {
                    return Ok(Vec::new());
                }
                let muted = mixer.toggle_muted(&binding.target)?;
                debug!(encoder, target = %binding.target, ?muted, "Mute toggled");
                self.feedback(mixer, encoder, &binding.target)
            }
            DeviceMessage::Rejected(ref line) => {
                warn!("Controller rejected {:?}", line);
                Ok(Vec::new())
            }
        }
    }

    /// LED state for every bound encoder.
    pub fn refresh<D: AudioEndpoint, P: ProcessTable>(
        &self,
        mixer: &Mixer<D, P>,
    ) -> AudioResult<Vec<HostCommand>> {
        (0..self.bindings.len().min(usize::from(protocol::MAX_ENCODER) + 1))
            .map(|i| {
                let encoder = i as u8;
                self.led(mixer, encoder, &self.bindings[i].target)
            })
            .collect()
    }

    /// LED update after an event; none for encoders the LED command cannot address.
    fn feedback<D: AudioEndpoint, P: ProcessTable>(
        &self,
        mixer: &Mixer<D, P>,
        encoder: u8,
        target: &Target,
    ) -> AudioResult<Vec<HostCommand>> {
        if encoder > protocol::MAX_ENCODER {
            return Ok(Vec::new());
        }
        Ok(vec![self.led(mixer, encoder, target)?])
    }

    fn led<D: AudioEndpoint, P: ProcessTable>(
        &self,
        mixer: &Mixer<D, P>,
        encoder: u8,
        target: &Target,
    ) -> AudioResult<HostCommand> {
        let color = match mixer.is_muted(target)? {
            Some(false) => LedColor::Green,
            Some(true) => LedColor::Red,
            None => LedColor::Off,
        };
        Ok(HostCommand::SetLeds { encoder, color })
    }

    /// Serve the controller until `reader` reaches end of input.
    ///
    /// Audio faults and bad lines are logged and skipped; I/O errors end the loop.
    pub fn run<D, P, R, W>(&self, mixer: &Mixer<D, P>, reader: R, mut writer: W) -> io::Result<()>
    where
        D: AudioEndpoint,
        P: ProcessTable,
        R: BufRead,
        W: Write,
    {
        for line in reader.lines() {
            let line = line?;
            let message = match DeviceMessage::parse(&line) {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Ignoring controller line: {}", e);
                    continue;
                }
            };

            match self.handle(mixer, &message) {
                Ok(commands) => {
                    for command in commands {
                        write!(writer, "{}\r\n", command)?;
                    }
                    writer.flush()?;
                }
                Err(e) => warn!(?message, "Failed to apply controller event: {}", e),
            }
        }
        info!("Controller disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sim::{SimDevice, SimProcesses};
    use std::io::Cursor;

    fn setup() -> (SimDevice, SimProcesses, Mixer<SimDevice, SimProcesses>, KnobController) {
        let device = SimDevice::new();
        let processes = SimProcesses::new();
        let mixer = Mixer::new(device.clone(), processes.clone());
        let controller = KnobController::new(vec![
            EncoderBinding {
                target: Target::Device,
                step: 5,
            },
            EncoderBinding {
                target: Target::process("spotify").unwrap(),
                step: 2,
            },
        ]);
        (device, processes, mixer, controller)
    }

    #[test]
    fn test_rotation_changes_volume() {
        let (_device, _processes, mixer, controller) = setup();
        let commands = controller
            .handle(&mixer, &DeviceMessage::Rotated { encoder: 0, delta: -3 })
            .unwrap();
        assert_eq!(mixer.get_volume(&Target::Device).unwrap(), Some(85));
        assert_eq!(
            commands,
            vec![HostCommand::SetLeds { encoder: 0, color: LedColor::Green }]
        );
    }

    #[test]
    fn test_press_toggles_and_release_is_ignored() {
        let (_device, _processes, mixer, controller) = setup();
        let pressed = controller
            .handle(&mixer, &DeviceMessage::Button { encoder: 0, pressed: true })
            .unwrap();
        assert_eq!(
            pressed,
            vec![HostCommand::SetLeds { encoder: 0, color: LedColor::Red }]
        );
        let released = controller
            .handle(&mixer, &DeviceMessage::Button { encoder: 0, pressed: false })
            .unwrap();
        assert!(released.is_empty());
        assert_eq!(mixer.is_muted(&Target::Device).unwrap(), Some(true));
    }

    #[test]
    fn test_absent_target_turns_leds_off() {
        let (_device, _processes, mixer, controller) = setup();
        let commands = controller
            .handle(&mixer, &DeviceMessage::Rotated { encoder: 1, delta: 1 })
            .unwrap();
        assert_eq!(
            commands,
            vec![HostCommand::SetLeds { encoder: 1, color: LedColor::Off }]
        );
    }

    #[test]
    fn test_unbound_encoder_is_ignored() {
        let (_device, _processes, mixer, controller) = setup();
        let commands = controller
            .handle(&mixer, &DeviceMessage::Rotated { encoder: 4, delta: 1 })
            .unwrap();
        assert!(commands.is_empty());
    }

    #[test]
    fn test_high_encoders_get_no_led_command() {
        let (_device, _processes, mixer, _) = setup();
        let bindings = (0..11)
            .map(|_| EncoderBinding {
                target: Target::Device,
                step: 1,
            })
            .collect();
        let controller = KnobController::new(bindings);

        let commands = controller
            .handle(&mixer, &DeviceMessage::Rotated { encoder: 10, delta: -1 })
            .unwrap();
        assert!(commands.is_empty());
        assert_eq!(mixer.get_volume(&Target::Device).unwrap(), Some(99));

        let commands = controller
            .handle(&mixer, &DeviceMessage::Button { encoder: 10, pressed: true })
            .unwrap();
        assert!(commands.is_empty());
        assert_eq!(mixer.is_muted(&Target::Device).unwrap(), Some(true));

        let commands = controller.handle(&mixer, &DeviceMessage::Ready).unwrap();
        assert_eq!(commands.len(), 10);
        assert!(commands.iter().all(|c| c.to_string().len() == 8));
    }

    #[test]
    fn test_run_serves_until_eof() {
        let (device, processes, mixer, controller) = setup();
        processes.spawn(9, "Spotify");
        device.add_stream(9);

        let input = "\r\nREADY\r\nRVAL.1=-10\r\nGARBAGE\r\nRBTN.1=1\r\nRBTN.1=0\r\n";
        let mut output = Vec::new();
        controller
            .run(&mixer, Cursor::new(input), &mut output)
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "RLED.0=G\r\nRLED.1=G\r\nRLED.1=G\r\nRLED.1=R\r\n"
        );
        let spotify = Target::process("Spotify").unwrap();
        assert_eq!(mixer.get_volume(&spotify).unwrap(), Some(80));
        assert_eq!(mixer.is_muted(&spotify).unwrap(), Some(true));
    }

    #[test]
    fn test_run_with_vanished_program() {
        let (device, processes, mixer, controller) = setup();
        processes.spawn(9, "Spotify");
        device.add_stream(9);
        device.remove_streams(9);

        let mut output = Vec::new();
        controller
            .run(&mixer, Cursor::new("RVAL.1=1\r\nRVAL.0=-1\r\n"), &mut output)
            .unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "RLED.1=0\r\nRLED.0=G\r\n"
        );
    }
}
