//! Seat ownership for networked rooms.
//!
//! A networked room lets remote players claim its human seats. Each
//! [`Identity`] may hold at most one seat and each seat at most one
//! identity. AI seats are never bindable. The room asks the binding which
//! seat a caller holds before it accepts an action from them, and whether
//! every human seat is taken before play may start.

use std::collections::HashMap;

use gomoku_protocol::{Identity, Seat};

use crate::BindingError;

/// Bidirectional identity ⇄ seat map.
///
/// Two maps kept in sync, so both directions are O(1) and the "one seat
/// per identity, one identity per seat" rule can be checked before any
/// write:
///
/// ```text
/// connect(alice, 1) ──→ seats{1: alice}  identities{alice: 1}
/// connect(bob, 1)   ──→ SeatTaken(1)
/// connect(alice, 2) ──→ IdentityAlreadyBound
/// disconnect(alice) ──→ Some(1), both maps empty
/// ```
#[derive(Debug, Clone, Default)]
pub struct SeatBinding {
    seats: HashMap<Seat, Identity>,
    identities: HashMap<Identity, Seat>,
    /// Seats remote players may take (the human seats).
    bindable: Vec<Seat>,
}

impl SeatBinding {
    /// A binding where only `bindable` seats can be taken.
    pub fn new(bindable: impl IntoIterator<Item = Seat>) -> Self {
        let mut bindable: Vec<Seat> = bindable.into_iter().collect();
        bindable.sort();
        bindable.dedup();
        Self {
            seats: HashMap::new(),
            identities: HashMap::new(),
            bindable,
        }
    }

    /// Binds `identity` to `seat`.
    ///
    /// Returns `Ok(true)` for a new binding and `Ok(false)` when the same
    /// identity reconnects to the seat it already holds.
    ///
    /// # Errors
    /// - [`BindingError::SeatUnavailable`]: the seat can't be bound
    /// - [`BindingError::SeatTaken`]: another identity holds it
    /// - [`BindingError::IdentityAlreadyBound`]: the identity holds the
    ///   other seat
    pub fn connect(&mut self, identity: Identity, seat: Seat) -> Result<bool, BindingError> {
        if !self.bindable.contains(&seat) {
            return Err(BindingError::SeatUnavailable(seat));
        }
        if let Some(holder) = self.seats.get(&seat) {
            if *holder == identity {
                return Ok(false);
            }
            return Err(BindingError::SeatTaken(seat));
        }
        if let Some(held) = self.identities.get(&identity) {
            return Err(BindingError::IdentityAlreadyBound {
                identity,
                seat: *held,
            });
        }

        self.seats.insert(seat, identity.clone());
        self.identities.insert(identity.clone(), seat);
        tracing::info!(%identity, %seat, "seat bound");
        Ok(true)
    }

    /// Releases whatever seat `identity` holds. No-op for unknown identities.
    pub fn disconnect(&mut self, identity: &Identity) -> Option<Seat> {
        let seat = self.identities.remove(identity)?;
        self.seats.remove(&seat);
        tracing::info!(%identity, %seat, "seat released");
        Some(seat)
    }

    /// Bindable seats nobody holds, in seat order.
    pub fn available_seats(&self) -> Vec<Seat> {
        self.bindable
            .iter()
            .copied()
            .filter(|seat| !self.seats.contains_key(seat))
            .collect()
    }

    pub fn seat_of(&self, identity: &Identity) -> Option<Seat> {
        self.identities.get(identity).copied()
    }

    /// Like [`seat_of`](Self::seat_of), failing with
    /// [`BindingError::NotSeated`].
    pub fn require_seat(&self, identity: &Identity) -> Result<Seat, BindingError> {
        self.seat_of(identity)
            .ok_or_else(|| BindingError::NotSeated(identity.clone()))
    }

    pub fn identity_at(&self, seat: Seat) -> Option<&Identity> {
        self.seats.get(&seat)
    }

    pub fn is_bound(&self, seat: Seat) -> bool {
        self.seats.contains_key(&seat)
    }

    pub fn is_bindable(&self, seat: Seat) -> bool {
        self.bindable.contains(&seat)
    }

    /// `true` once every bindable seat is held.
    pub fn is_complete(&self) -> bool {
        self.bindable.iter().all(|seat| self.seats.contains_key(seat))
    }

    pub fn bound_count(&self) -> usize {
        self.seats.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::new("10.0.0.1")
    }

    fn bob() -> Identity {
        Identity::new("10.0.0.2")
    }

    #[test]
    fn test_connect_then_lookup_both_ways() {
        let mut binding = SeatBinding::new(Seat::ALL);
        assert_eq!(binding.connect(alice(), Seat::Two), Ok(true));
        assert_eq!(binding.seat_of(&alice()), Some(Seat::Two));
        assert_eq!(binding.identity_at(Seat::Two), Some(&alice()));
        assert_eq!(binding.available_seats(), vec![Seat::One]);
    }

    #[test]
    fn test_reconnect_same_pair_is_idempotent() {
        let mut binding = SeatBinding::new(Seat::ALL);
        binding.connect(alice(), Seat::One).unwrap();
        assert_eq!(binding.connect(alice(), Seat::One), Ok(false));
        assert_eq!(binding.bound_count(), 1);
    }

    #[test]
    fn test_ai_seat_is_unavailable() {
        let mut binding = SeatBinding::new([Seat::One]);
        assert_eq!(
            binding.connect(alice(), Seat::Two),
            Err(BindingError::SeatUnavailable(Seat::Two))
        );
        assert!(!binding.is_bindable(Seat::Two));
    }

    #[test]
    fn test_require_seat_for_stranger() {
        let binding = SeatBinding::new(Seat::ALL);
        assert_eq!(
            binding.require_seat(&bob()),
            Err(BindingError::NotSeated(bob()))
        );
    }
}
