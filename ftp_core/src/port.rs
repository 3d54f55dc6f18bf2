//! Data port negotiation.
//!
//! The first port of a session is drawn from the session's own generator.
//! Every later port steps forward by one through `[floor, ceil)`, wrapping
//! at the top. Two sessions may still land on the same port at the same
//! time; binding failure is reported by the listener, not predicted here.

use anyhow::{Result, bail};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::protocol::constants::{DATA_PORT_CEIL, DATA_PORT_FLOOR};

/// Half-open range of data ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub floor: u16,
    pub ceil: u16,
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            floor: DATA_PORT_FLOOR,
            ceil: DATA_PORT_CEIL,
        }
    }
}

impl PortRange {
    pub fn new(floor: u16, ceil: u16) -> Result<Self> {
        let range = Self { floor, ceil };
        range.validate()?;
        Ok(range)
    }

    /// A rotation needs at least two ports to yield a different one
    pub fn validate(&self) -> Result<()> {
        if self.floor == 0 {
            bail!("Data port range must not start at port 0");
        }
        if self.ceil <= self.floor || self.len() < 2 {
            bail!(
                "Data port range [{}, {}) must hold at least two ports",
                self.floor,
                self.ceil
            );
        }
        Ok(())
    }

    pub fn len(&self) -> u16 {
        self.ceil.saturating_sub(self.floor)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, port: u16) -> bool {
        port >= self.floor && port < self.ceil
    }
}

/// Forward rotation: `floor + ((previous - floor + 1) mod (ceil - floor))`.
/// Ports outside the range are folded back into it.
pub fn next_port(range: PortRange, previous: u16) -> u16 {
    let span = i32::from(range.len().max(1));
    let offset = (i32::from(previous) - i32::from(range.floor) + 1).rem_euclid(span);
    // offset < span <= u16::MAX - floor
    range.floor + offset as u16
}

/// Per-session port state
#[derive(Debug, Clone)]
pub struct PortNegotiator {
    range: PortRange,
    current: u16,
}

impl PortNegotiator {
    /// Seed the rotation with a random port drawn from `rng`
    pub fn new<R: Rng + ?Sized>(range: PortRange, rng: &mut R) -> Self {
        let current = if range.is_empty() {
            range.floor
        } else {
            rng.random_range(range.floor..range.ceil)
        };
        Self { range, current }
    }

    /// The port most recently handed out (or the seed, before the first call)
    pub fn current(&self) -> u16 {
        self.current
    }

    /// Rotate and return the port for the next data connection
    pub fn next_port(&mut self) -> u16 {
        self.current = next_port(self.range, self.current);
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_next_port_stays_in_range_and_differs() {
        let range = PortRange::default();
        for p in range.floor..range.ceil {
            let next = next_port(range, p);
            assert!(range.contains(next), "{} -> {} left the range", p, next);
            assert_ne!(next, p);
        }
    }

    #[test]
    fn test_wraps_at_ceiling() {
        let range = PortRange::default();
        assert_eq!(next_port(range, range.ceil - 1), range.floor);
        assert_eq!(next_port(range, range.floor), range.floor + 1);
    }

    #[test]
    fn test_full_rotation_returns_to_start() {
        let range = PortRange::new(40000, 40007).unwrap();
        for start in range.floor..range.ceil {
            let mut seen = std::collections::HashSet::new();
            let mut p = start;
            for _ in 0..range.len() {
                assert!(seen.insert(p), "port {} repeated early", p);
                p = next_port(range, p);
            }
            assert_eq!(p, start);
        }
    }

    #[test]
    fn test_out_of_range_is_folded_in() {
        let range = PortRange::new(100, 110).unwrap();
        assert!(range.contains(next_port(range, 5)));
        assert!(range.contains(next_port(range, 60000)));
    }

    #[test]
    fn test_range_validation() {
        assert!(PortRange::new(9000, 9000).is_err());
        assert!(PortRange::new(9000, 9001).is_err());
        assert!(PortRange::new(9001, 9000).is_err());
        assert!(PortRange::new(0, 10).is_err());
        assert!(PortRange::new(9000, 9002).is_ok());
    }

    #[test]
    fn test_negotiator_seeded_per_session() {
        let range = PortRange::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut negotiator = PortNegotiator::new(range, &mut rng);
        assert!(range.contains(negotiator.current()));

        let seed = negotiator.current();
        let first = negotiator.next_port();
        assert_eq!(first, next_port(range, seed));
        assert_ne!(negotiator.next_port(), first);

        // Same seed, same sequence
        let mut again = PortNegotiator::new(range, &mut StdRng::seed_from_u64(7));
        assert_eq!(again.current(), seed);
        assert_eq!(again.next_port(), first);
    }
}
