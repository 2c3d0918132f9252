/*
 * The 4-bit command nibble from the vision board.
 *
 * Bit 0 is the lowest input pin. The board only ever emits the codes listed
 * below; anything else (a pin floating, a half-updated nibble) is treated as a
 * reason to stop.
 */

use crate::config::STEER_TIERS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SteerTier {
    Low,
    Mid,
    High,
}

impl SteerTier {
    pub fn percent(self) -> u8 {
        match self {
            SteerTier::Low => STEER_TIERS[0],
            SteerTier::Mid => STEER_TIERS[1],
            SteerTier::High => STEER_TIERS[2],
        }
    }
}

/// Traffic-control codes that start a compliance sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrafficSignal {
    Stop,
    RedLight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Forward,
    Right(SteerTier),
    Left(SteerTier),
    /// The lane markings ran out.
    LaneEnd,
    Stop,
    RedLight,
    Unrecognized(u8),
}

impl Command {
    pub const MASK: u8 = 0x0f;

    pub fn from_port(raw: u8) -> Self {
        match raw & Self::MASK {
            0 => Command::Forward,
            1 => Command::Right(SteerTier::Low),
            2 => Command::Right(SteerTier::Mid),
            3 => Command::Right(SteerTier::High),
            4 => Command::Left(SteerTier::Low),
            5 => Command::Left(SteerTier::Mid),
            6 => Command::Left(SteerTier::High),
            7 => Command::LaneEnd,
            8 => Command::Stop,
            9 => Command::RedLight,
            code => Command::Unrecognized(code),
        }
    }

    pub fn traffic_signal(self) -> Option<TrafficSignal> {
        match self {
            Command::Stop => Some(TrafficSignal::Stop),
            Command::RedLight => Some(TrafficSignal::RedLight),
            _ => None,
        }
    }

    pub fn is_traffic_control(self) -> bool {
        self.traffic_signal().is_some()
    }
}

impl From<TrafficSignal> for Command {
    fn from(signal: TrafficSignal) -> Self {
        match signal {
            TrafficSignal::Stop => Command::Stop,
            TrafficSignal::RedLight => Command::RedLight,
        }
    }
}
