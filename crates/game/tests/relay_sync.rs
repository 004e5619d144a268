use glam::{Quat, Vec3};

use tether::{
    BodyId, BodyProperties, Inbound, Ownership, PhysicsCommand, PhysicsError, PhysicsMessage,
    PhysicsSession, PickupError, PickupSelector, PlayerId, Relay, RelayConfig, SessionConfig,
    TrackedId, Transform,
};

const FRAME: f32 = 1.0 / 60.0;

fn room(players: &[&str], relay_config: RelayConfig) -> (Relay, Vec<PhysicsSession>) {
    let mut relay = Relay::new(relay_config);
    let sessions = players
        .iter()
        .map(|id| {
            relay.join(PlayerId::from(*id));
            PhysicsSession::new(PlayerId::from(*id), SessionConfig::default())
        })
        .collect();
    (relay, sessions)
}

fn pump(relay: &mut Relay, peers: &mut [PhysicsSession]) {
    for peer in peers.iter_mut() {
        let from = peer.local_id().clone();
        for outbound in peer.drain_outbound() {
            relay.send(&from, &outbound).unwrap();
        }
    }
    for peer in peers.iter_mut() {
        let me = peer.local_id().clone();
        for inbound in relay.receive(&me) {
            peer.handle_inbound(inbound);
        }
    }
}

fn run(relay: &mut Relay, peers: &mut [PhysicsSession], seconds: f32) {
    let frames = (seconds / FRAME).round() as usize;
    for _ in 0..frames {
        for peer in peers.iter_mut() {
            peer.frame(FRAME);
        }
        pump(relay, peers);
    }
}

fn spawn(session: &mut PhysicsSession, id: &str, position: Vec3, mass: f32) -> BodyId {
    session
        .handle_command(PhysicsCommand::Spawn {
            properties: BodyProperties::dynamic_box(Vec3::splat(0.5), mass),
            transform: Transform::from_position(position),
            id: Some(BodyId::from(id)),
        })
        .unwrap()
        .unwrap()
}

fn position(session: &PhysicsSession, id: &BodyId) -> Vec3 {
    let ctx = session.context();
    ctx.world.body_position(ctx.registry.handle(id).unwrap()).unwrap()
}

#[test]
fn creation_reaches_every_peer_once() {
    let (mut relay, mut peers) = room(&["p1", "p2", "p3"], RelayConfig::default());
    let id = spawn(&mut peers[0], "obj_1", Vec3::new(0.0, 0.5, 0.0), 1.0);
    spawn(&mut peers[0], "obj_1", Vec3::new(9.0, 9.0, 9.0), 1.0);
    pump(&mut relay, &mut peers);

    for peer in &peers {
        assert_eq!(peer.context().registry.len(), 1);
        assert!((position(peer, &id) - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-4);
    }
}

#[test]
fn remote_pickup_blocks_local_pickup() {
    let (mut relay, mut peers) = room(&["p1", "p2"], RelayConfig::default());
    let id = spawn(&mut peers[0], "obj_1", Vec3::new(0.0, 5.0, 0.0), 2.0);
    pump(&mut relay, &mut peers);

    peers[1]
        .handle_command(PhysicsCommand::Pickup(PickupSelector::Id(id.clone())))
        .unwrap();
    pump(&mut relay, &mut peers);

    let p2 = PlayerId::from("p2");
    assert_eq!(peers[0].ownership(&id), Ownership::HeldByRemote(p2.clone()));
    assert_eq!(
        peers[0].handle_command(PhysicsCommand::Pickup(PickupSelector::Id(id.clone()))),
        Err(PhysicsError::Pickup(PickupError::HeldByRemote {
            body: id.clone(),
            holder: p2,
        }))
    );

    // The held body still appears in p1's own broadcast.
    match peers[0].snapshot().unwrap() {
        PhysicsMessage::State { objects } => assert!(objects.iter().any(|o| o.id == id)),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn simultaneous_pickups_converge() {
    let (mut relay, mut peers) = room(&["p1", "p2", "p3"], RelayConfig::default());
    let id = spawn(&mut peers[0], "obj_1", Vec3::new(0.0, 2.0, 0.0), 2.0);
    pump(&mut relay, &mut peers);

    for peer in peers.iter_mut().take(2) {
        peer.handle_command(PhysicsCommand::Pickup(PickupSelector::Id(id.clone())))
            .unwrap();
        peer.handle_command(PhysicsCommand::UpdateTarget(Transform::new(
            Vec3::new(1.0, 2.0, 0.0),
            Quat::IDENTITY,
        )))
        .unwrap();
    }

    run(&mut relay, &mut peers, 0.1);

    let p1 = PlayerId::from("p1");
    assert_eq!(peers[0].ownership(&id), Ownership::HeldByLocal);
    assert_eq!(peers[1].ownership(&id), Ownership::HeldByRemote(p1.clone()));
    assert_eq!(peers[2].ownership(&id), Ownership::HeldByRemote(p1));
    assert!(peers[1].held().is_none());

    run(&mut relay, &mut peers, 1.5);
    let truth = position(&peers[0], &id);
    for peer in &peers[1..] {
        assert!(
            (position(peer, &id) - truth).length() < 0.1,
            "{} sees {} at {}, holder at {}",
            peer.local_id(),
            id,
            position(peer, &id),
            truth
        );
    }
}

#[test]
fn third_peer_agrees_whatever_claim_it_sees_first() {
    // p2 pumps first, so p3 hears p2's claim before p1's.
    let (mut relay, mut peers) = room(&["p2", "p1", "p3"], RelayConfig::default());
    let id = spawn(&mut peers[0], "obj_1", Vec3::new(0.0, 2.0, 0.0), 2.0);
    pump(&mut relay, &mut peers);

    for peer in peers.iter_mut().take(2) {
        peer.handle_command(PhysicsCommand::Pickup(PickupSelector::Id(id.clone())))
            .unwrap();
    }
    run(&mut relay, &mut peers, 0.2);

    let p1 = PlayerId::from("p1");
    assert_eq!(peers[0].ownership(&id), Ownership::HeldByRemote(p1.clone()));
    assert_eq!(peers[1].ownership(&id), Ownership::HeldByLocal);
    assert_eq!(peers[2].ownership(&id), Ownership::HeldByRemote(p1.clone()));

    assert_eq!(
        peers[2].handle_command(PhysicsCommand::Pickup(PickupSelector::Id(id.clone()))),
        Err(PhysicsError::Pickup(PickupError::HeldByRemote {
            body: id.clone(),
            holder: p1,
        }))
    );
    run(&mut relay, &mut peers, 0.2);
    assert_eq!(peers[1].ownership(&id), Ownership::HeldByLocal);
}

#[test]
fn holder_disconnect_restores_body() {
    let (mut relay, mut peers) = room(&["p1", "p4"], RelayConfig::default());
    let id = spawn(&mut peers[0], "obj_3", Vec3::new(0.0, 3.0, 0.0), 2.0);
    pump(&mut relay, &mut peers);

    peers[1]
        .handle_command(PhysicsCommand::Pickup(PickupSelector::Id(id.clone())))
        .unwrap();
    pump(&mut relay, &mut peers);

    let handle = peers[0].context().registry.handle(&id).unwrap();
    assert!((peers[0].context().world.body_mass(handle).unwrap() - 0.1).abs() < 1e-4);

    relay.leave(&PlayerId::from("p4"));
    let mut leaver = peers.pop().unwrap();
    leaver.leave_room();
    pump(&mut relay, &mut peers);

    assert_eq!(peers[0].ownership(&id), Ownership::Free);
    let world = &peers[0].context().world;
    assert!((world.body_mass(handle).unwrap() - 2.0).abs() < 1e-4);
    assert_eq!(world.gravity_scale(handle), Some(1.0));

    let before = position(&peers[0], &id).y;
    run(&mut relay, &mut peers, 0.2);
    assert!(position(&peers[0], &id).y < before);
}

#[test]
fn first_player_pose_snaps() {
    let (mut relay, mut peers) = room(&["p1", "p4"], RelayConfig::default());
    let pose = Transform::new(Vec3::new(5.0, 1.0, 2.0), Quat::from_rotation_y(0.7));
    peers[1]
        .handle_command(PhysicsCommand::PublishPose(pose))
        .unwrap();
    pump(&mut relay, &mut peers);

    let remote = peers[0]
        .interpolator()
        .get(&TrackedId::Player(PlayerId::from("p4")))
        .unwrap();
    assert_eq!(remote.current, remote.target);
    assert!((remote.current.position - pose.position).length() < 1e-5);
}

#[test]
fn repeated_snapshot_is_idempotent() {
    let (mut relay, mut peers) = room(&["p1", "p2"], RelayConfig::default());
    let id = spawn(&mut peers[0], "obj_1", Vec3::new(0.0, 4.0, 0.0), 1.0);
    pump(&mut relay, &mut peers);
    run(&mut relay, &mut peers, 0.1);

    let state = peers[0].snapshot().unwrap();

    let from = PlayerId::from("p1");
    peers[1].handle_inbound(Inbound::Message {
        from: from.clone(),
        message: state.clone(),
    });
    let once = position(&peers[1], &id);
    peers[1].handle_inbound(Inbound::Message {
        from,
        message: state,
    });
    assert_eq!(position(&peers[1], &id), once);
    assert_eq!(peers[1].context().registry.len(), 1);
}

#[test]
fn ownership_survives_lossy_peer_channel() {
    let config = RelayConfig {
        loss_percent: 100.0,
        ..Default::default()
    };
    let (mut relay, mut peers) = room(&["p1", "p2"], config);
    let id = spawn(&mut peers[0], "obj_1", Vec3::new(0.0, 2.0, 0.0), 1.0);
    run(&mut relay, &mut peers, 0.05);

    peers[1]
        .handle_command(PhysicsCommand::Pickup(PickupSelector::Id(id.clone())))
        .unwrap();
    run(&mut relay, &mut peers, 0.5);

    assert_eq!(
        peers[0].ownership(&id),
        Ownership::HeldByRemote(PlayerId::from("p2"))
    );
    assert!(relay.stats().payloads_lost > 0);
}
