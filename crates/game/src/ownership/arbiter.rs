use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::ids::{BodyId, PlayerId};
use crate::physics::Transform;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Holder {
    Local,
    Remote(PlayerId),
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote(player) => write!(f, "{}", player),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ownership {
    Free,
    HeldByLocal,
    HeldByRemote(PlayerId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoldState {
    pub body: BodyId,
    pub holder: Holder,
    pub original_mass: f32,
    pub original_gravity_scale: f32,
    pub target: Option<Transform>,
}

impl HoldState {
    pub fn new(body: BodyId, holder: Holder, original_mass: f32, original_gravity_scale: f32) -> Self {
        Self {
            body,
            holder,
            original_mass,
            original_gravity_scale,
            target: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    Granted {
        /// Hold on the same body that lost to this claim.
        preempted: Option<HoldState>,
        stale: Option<HoldState>,
    },
    Rejected {
        current: Holder,
    },
}

impl ClaimOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// Racing claims on a held body go to the lower player id.
#[derive(Debug)]
pub struct OwnershipArbiter {
    local_id: PlayerId,
    holds: BTreeMap<BodyId, HoldState>,
    by_holder: HashMap<Holder, BodyId>,
}

impl OwnershipArbiter {
    pub fn new(local_id: PlayerId) -> Self {
        Self {
            local_id,
            holds: BTreeMap::new(),
            by_holder: HashMap::new(),
        }
    }

    pub fn local_id(&self) -> &PlayerId {
        &self.local_id
    }

    pub fn ownership(&self, body: &BodyId) -> Ownership {
        match self.holds.get(body).map(|h| &h.holder) {
            None => Ownership::Free,
            Some(Holder::Local) => Ownership::HeldByLocal,
            Some(Holder::Remote(player)) => Ownership::HeldByRemote(player.clone()),
        }
    }

    pub fn hold(&self, body: &BodyId) -> Option<&HoldState> {
        self.holds.get(body)
    }

    pub fn held_by(&self, holder: &Holder) -> Option<&BodyId> {
        self.by_holder.get(holder)
    }

    pub fn local_hold(&self) -> Option<&HoldState> {
        let body = self.by_holder.get(&Holder::Local)?;
        self.holds.get(body)
    }

    pub fn local_hold_mut(&mut self) -> Option<&mut HoldState> {
        let body = self.by_holder.get(&Holder::Local)?;
        self.holds.get_mut(body)
    }

    pub fn holds(&self) -> impl Iterator<Item = &HoldState> {
        self.holds.values()
    }

    pub fn len(&self) -> usize {
        self.holds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holds.is_empty()
    }

    pub fn claim(&mut self, mut state: HoldState) -> ClaimOutcome {
        if state.holder == Holder::Local && self.by_holder.contains_key(&Holder::Local) {
            return ClaimOutcome::Rejected {
                current: Holder::Local,
            };
        }

        let mut preempted = None;
        if let Some(current) = self.holds.get(&state.body) {
            if !self.wins_conflict(&state.holder, &current.holder) {
                log::debug!(
                    "claim on {} by {} ignored, held by {}",
                    state.body,
                    state.holder,
                    current.holder
                );
                return ClaimOutcome::Rejected {
                    current: current.holder.clone(),
                };
            }

            let displaced = self.remove(&state.body);
            if let Some(displaced) = &displaced {
                state.original_mass = displaced.original_mass;
                state.original_gravity_scale = displaced.original_gravity_scale;
                log::debug!(
                    "{} preempts {} on {}",
                    state.holder,
                    displaced.holder,
                    state.body
                );
            }
            preempted = displaced;
        }

        let stale = self
            .by_holder
            .get(&state.holder)
            .cloned()
            .and_then(|previous| self.remove(&previous));

        log::debug!("{} now holds {}", state.holder, state.body);
        self.by_holder.insert(state.holder.clone(), state.body.clone());
        self.holds.insert(state.body.clone(), state);

        ClaimOutcome::Granted { preempted, stale }
    }

    pub fn release(&mut self, body: &BodyId, holder: &Holder) -> Option<HoldState> {
        if self.holds.get(body).map(|h| &h.holder) != Some(holder) {
            return None;
        }
        let released = self.remove(body);
        if released.is_some() {
            log::debug!("{} released {}", holder, body);
        }
        released
    }

    pub fn release_all(&mut self, holder: &Holder) -> Vec<HoldState> {
        let bodies: Vec<BodyId> = self
            .holds
            .values()
            .filter(|h| &h.holder == holder)
            .map(|h| h.body.clone())
            .collect();
        bodies.iter().filter_map(|body| self.remove(body)).collect()
    }

    /// Forgets a body regardless of who holds it, e.g. when it is destroyed.
    pub fn forget(&mut self, body: &BodyId) -> Option<HoldState> {
        self.remove(body)
    }

    pub fn clear(&mut self) -> Vec<HoldState> {
        self.by_holder.clear();
        std::mem::take(&mut self.holds).into_values().collect()
    }

    pub fn accepts_snapshot_from(&self, body: &BodyId, sender: &PlayerId) -> bool {
        match self.holds.get(body).map(|h| &h.holder) {
            None => true,
            Some(Holder::Local) => false,
            Some(Holder::Remote(player)) => player == sender,
        }
    }

    pub fn allows_local_force(&self, body: &BodyId) -> bool {
        !matches!(
            self.holds.get(body).map(|h| &h.holder),
            Some(Holder::Remote(_))
        )
    }

    fn player_of<'a>(&'a self, holder: &'a Holder) -> &'a PlayerId {
        match holder {
            Holder::Local => &self.local_id,
            Holder::Remote(player) => player,
        }
    }

    // A local claim only happens on a body seen as free, so it never preempts.
    fn wins_conflict(&self, claimant: &Holder, current: &Holder) -> bool {
        match claimant {
            Holder::Local => false,
            Holder::Remote(player) => player < self.player_of(current),
        }
    }

    fn remove(&mut self, body: &BodyId) -> Option<HoldState> {
        let state = self.holds.remove(body)?;
        if self.by_holder.get(&state.holder) == Some(body) {
            self.by_holder.remove(&state.holder);
        }
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(id: &str) -> Holder {
        Holder::Remote(PlayerId::from(id))
    }

    fn hold(body: &str, holder: Holder) -> HoldState {
        HoldState::new(BodyId::from(body), holder, 2.0, 1.0)
    }

    #[test]
    fn free_to_local_and_back() {
        let mut arbiter = OwnershipArbiter::new(PlayerId::from("p1"));
        let body = BodyId::from("obj_1");

        assert!(arbiter.claim(hold("obj_1", Holder::Local)).is_granted());
        assert_eq!(arbiter.ownership(&body), Ownership::HeldByLocal);

        assert!(arbiter.release(&body, &remote("p2")).is_none());
        let released = arbiter.release(&body, &Holder::Local).unwrap();
        assert_eq!(released.original_mass, 2.0);
        assert_eq!(arbiter.ownership(&body), Ownership::Free);
        assert!(arbiter.held_by(&Holder::Local).is_none());
    }

    #[test]
    fn later_higher_remote_claim_is_ignored() {
        let mut arbiter = OwnershipArbiter::new(PlayerId::from("p1"));
        let body = BodyId::from("obj_1");

        assert!(arbiter.claim(hold("obj_1", remote("p2"))).is_granted());
        let second = arbiter.claim(hold("obj_1", remote("p3")));

        assert_eq!(second, ClaimOutcome::Rejected { current: remote("p2") });
        assert_eq!(arbiter.ownership(&body), Ownership::HeldByRemote("p2".into()));
    }

    #[test]
    fn remote_claims_settle_independent_of_arrival_order() {
        let body = BodyId::from("obj_1");
        let orders = [["p2", "p1"], ["p1", "p2"]];

        for order in orders {
            let mut arbiter = OwnershipArbiter::new(PlayerId::from("p3"));
            for player in order {
                arbiter.claim(hold("obj_1", remote(player)));
            }
            assert_eq!(
                arbiter.ownership(&body),
                Ownership::HeldByRemote("p1".into()),
                "claims arrived as {:?}",
                order
            );
            assert!(arbiter.held_by(&remote("p2")).is_none());
        }

        // The loser's yield arriving afterwards changes nothing.
        let mut arbiter = OwnershipArbiter::new(PlayerId::from("p3"));
        arbiter.claim(hold("obj_1", remote("p2")));
        arbiter.claim(hold("obj_1", remote("p1")));
        assert!(arbiter.release(&body, &remote("p2")).is_none());
        assert_eq!(arbiter.ownership(&body), Ownership::HeldByRemote("p1".into()));
    }

    #[test]
    fn local_pickup_rejected_while_remote_holds() {
        let mut arbiter = OwnershipArbiter::new(PlayerId::from("p1"));
        arbiter.claim(hold("obj_1", remote("p2")));

        let outcome = arbiter.claim(hold("obj_1", Holder::Local));
        assert!(!outcome.is_granted());
        assert!(!arbiter.allows_local_force(&BodyId::from("obj_1")));
    }

    #[test]
    fn lower_remote_id_preempts_local_hold() {
        let mut arbiter = OwnershipArbiter::new(PlayerId::from("p2"));
        let mut local = hold("obj_1", Holder::Local);
        local.original_mass = 5.0;
        arbiter.claim(local);

        let mut incoming = hold("obj_1", remote("p1"));
        incoming.original_mass = 0.1;
        let outcome = arbiter.claim(incoming);

        match outcome {
            ClaimOutcome::Granted { preempted, stale } => {
                assert_eq!(preempted.unwrap().holder, Holder::Local);
                assert!(stale.is_none());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        let body = BodyId::from("obj_1");
        assert_eq!(arbiter.ownership(&body), Ownership::HeldByRemote("p1".into()));
        assert_eq!(arbiter.hold(&body).unwrap().original_mass, 5.0);
        assert!(arbiter.held_by(&Holder::Local).is_none());
    }

    #[test]
    fn higher_remote_id_loses_to_local_hold() {
        let mut arbiter = OwnershipArbiter::new(PlayerId::from("p1"));
        arbiter.claim(hold("obj_1", Holder::Local));

        let outcome = arbiter.claim(hold("obj_1", remote("p2")));

        assert_eq!(outcome, ClaimOutcome::Rejected { current: Holder::Local });
        assert_eq!(arbiter.ownership(&BodyId::from("obj_1")), Ownership::HeldByLocal);
    }

    #[test]
    fn one_body_per_holder() {
        let mut arbiter = OwnershipArbiter::new(PlayerId::from("p1"));
        arbiter.claim(hold("a", Holder::Local));
        assert!(!arbiter.claim(hold("b", Holder::Local)).is_granted());

        arbiter.claim(hold("c", remote("p2")));
        let outcome = arbiter.claim(hold("d", remote("p2")));
        match outcome {
            ClaimOutcome::Granted { stale, .. } => {
                assert_eq!(stale.unwrap().body, BodyId::from("c"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(arbiter.ownership(&BodyId::from("c")), Ownership::Free);
        assert_eq!(arbiter.held_by(&remote("p2")), Some(&BodyId::from("d")));
    }

    #[test]
    fn disconnect_releases_everything_held() {
        let mut arbiter = OwnershipArbiter::new(PlayerId::from("p1"));
        arbiter.claim(hold("obj_3", remote("p4")));
        arbiter.claim(hold("obj_4", Holder::Local));

        let released = arbiter.release_all(&remote("p4"));

        assert_eq!(released.len(), 1);
        assert_eq!(arbiter.ownership(&BodyId::from("obj_3")), Ownership::Free);
        assert_eq!(arbiter.ownership(&BodyId::from("obj_4")), Ownership::HeldByLocal);
    }

    #[test]
    fn snapshot_gate() {
        let mut arbiter = OwnershipArbiter::new(PlayerId::from("p1"));
        arbiter.claim(hold("mine", Holder::Local));
        arbiter.claim(hold("theirs", remote("p2")));
        let p2 = PlayerId::from("p2");
        let p3 = PlayerId::from("p3");

        assert!(!arbiter.accepts_snapshot_from(&BodyId::from("mine"), &p2));
        assert!(arbiter.accepts_snapshot_from(&BodyId::from("theirs"), &p2));
        assert!(!arbiter.accepts_snapshot_from(&BodyId::from("theirs"), &p3));
        assert!(arbiter.accepts_snapshot_from(&BodyId::from("free"), &p3));
    }

    #[test]
    fn exclusivity_under_claim_storm() {
        let mut arbiter = OwnershipArbiter::new(PlayerId::from("p5"));
        let claimants = [
            Holder::Local,
            remote("p9"),
            remote("p2"),
            Holder::Local,
            remote("p7"),
            remote("p1"),
        ];

        for (i, holder) in claimants.iter().cycle().take(60).enumerate() {
            let body = format!("obj_{}", i % 4);
            if i % 5 == 0 {
                arbiter.release(&BodyId::from(body.as_str()), holder);
            } else {
                arbiter.claim(hold(&body, holder.clone()));
            }

            let mut seen = std::collections::HashSet::new();
            for state in arbiter.holds() {
                assert!(seen.insert(state.holder.clone()), "holder holds two bodies");
                assert_eq!(arbiter.held_by(&state.holder), Some(&state.body));
            }
        }
    }
}
