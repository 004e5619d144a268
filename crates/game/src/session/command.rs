use std::collections::VecDeque;

use glam::Vec3;

use crate::hold::PickupSelector;
use crate::ids::BodyId;
use crate::physics::{BodyProperties, Transform};

#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsCommand {
    Spawn {
        properties: BodyProperties,
        transform: Transform,
        id: Option<BodyId>,
    },
    Despawn(BodyId),
    Pickup(PickupSelector),
    UpdateTarget(Transform),
    Drop,
    Throw {
        impulse: Vec3,
    },
    ApplyForce {
        id: BodyId,
        force: Vec3,
    },
    /// The local player's camera pose, relayed as `player:move`.
    PublishPose(Transform),
}

pub struct CommandBuffer {
    commands: VecDeque<PhysicsCommand>,
    max_size: usize,
}

impl CommandBuffer {
    pub fn new(max_size: usize) -> Self {
        Self {
            commands: VecDeque::with_capacity(max_size),
            max_size: max_size.max(1),
        }
    }

    pub fn push(&mut self, command: PhysicsCommand) {
        if self.commands.len() >= self.max_size {
            if let Some(dropped) = self.commands.pop_front() {
                log::warn!("command buffer full, dropping {:?}", dropped);
            }
        }
        self.commands.push_back(command);
    }

    pub fn drain(&mut self) -> Vec<PhysicsCommand> {
        self.commands.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_command_is_dropped_when_full() {
        let mut buffer = CommandBuffer::new(2);
        buffer.push(PhysicsCommand::Drop);
        buffer.push(PhysicsCommand::Despawn("a".into()));
        buffer.push(PhysicsCommand::Despawn("b".into()));

        assert_eq!(
            buffer.drain(),
            vec![
                PhysicsCommand::Despawn("a".into()),
                PhysicsCommand::Despawn("b".into())
            ]
        );
        assert!(buffer.is_empty());
    }
}
