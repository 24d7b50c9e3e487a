//! Actors placed on the grid and the motion state used to draw them.

use std::time::Duration;

use glam::Vec2;
use sokoban_core::{AssetKey, Direction, PlayerPose, Stance, Vector};

use crate::animation::{AnimationHandle, AnimationSet};

/// Extra time the walking pose lingers after a step animation ends.
const IDLE_DELAY: Duration = Duration::from_millis(200);

/// Static occupant of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Actor {
    pub(crate) position: Vector,
    pub(crate) asset: AssetKey,
}

impl Actor {
    pub(crate) const fn new(position: Vector, asset: AssetKey) -> Self {
        Self { position, asset }
    }
}

/// Actor that slides between cells when it moves.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Movable {
    pub(crate) actor: Actor,
    heading: Vector,
    animation: AnimationHandle,
}

impl Movable {
    pub(crate) fn new(
        position: Vector,
        asset: AssetKey,
        duration: Duration,
        animations: &mut AnimationSet,
    ) -> Self {
        Self {
            actor: Actor::new(position, asset),
            heading: Vector::ZERO,
            animation: animations.insert(duration),
        }
    }

    pub(crate) const fn position(&self) -> Vector {
        self.actor.position
    }

    /// Moves one cell and starts the slide animation.
    pub(crate) fn step(&mut self, direction: Direction, animations: &mut AnimationSet) {
        self.heading = direction.unit();
        self.actor.position = self.actor.position + self.heading;
        animations.restart(self.animation);
    }

    /// Interpolated position in cell units; never used for game rules.
    pub(crate) fn draw_position(&self, animations: &AnimationSet) -> Vec2 {
        let progress = animations.progress(self.animation);
        let position = Vec2::new(self.actor.position.x as f32, self.actor.position.y as f32);
        let heading = Vec2::new(self.heading.x as f32, self.heading.y as f32);
        position + heading * (progress - 1.0)
    }

    pub(crate) fn is_moving(&self, animations: &AnimationSet) -> bool {
        !animations.is_finished(self.animation)
    }

    pub(crate) fn reset(&mut self) {
        self.heading = Vector::ZERO;
    }
}

/// The player: a movable with a facing direction and a walking cycle.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Player {
    pub(crate) body: Movable,
    facing: Direction,
    moved: bool,
    leg: bool,
    idle: AnimationHandle,
}

impl Player {
    pub(crate) fn new(position: Vector, duration: Duration, animations: &mut AnimationSet) -> Self {
        Self {
            body: Movable::new(position, AssetKey::Player, duration, animations),
            facing: Direction::Down,
            moved: false,
            leg: false,
            idle: animations.insert(duration.saturating_add(IDLE_DELAY)),
        }
    }

    /// Reports whether a previous step is still sliding; new steps are refused meanwhile.
    pub(crate) fn is_animating(&self, animations: &AnimationSet) -> bool {
        self.moved && self.body.is_moving(animations)
    }

    pub(crate) fn step(&mut self, direction: Direction, animations: &mut AnimationSet) {
        self.moved = true;
        self.facing = direction;
        self.leg = !self.leg;
        animations.restart(self.idle);
        self.body.step(direction, animations);
    }

    pub(crate) fn pose(&self, animations: &AnimationSet) -> PlayerPose {
        let stance = if !self.moved || animations.is_finished(self.idle) {
            Stance::Idle
        } else if self.leg {
            Stance::LeftLeg
        } else {
            Stance::RightLeg
        };

        PlayerPose {
            facing: self.facing,
            stance,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.body.reset();
        self.moved = false;
        self.facing = Direction::Down;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(100);

    #[test]
    fn movable_slides_from_previous_cell() {
        let mut animations = AnimationSet::default();
        let mut movable = Movable::new(Vector::new(1, 1), AssetKey::Box, STEP, &mut animations);
        assert_eq!(movable.draw_position(&animations), Vec2::new(1.0, 1.0));

        movable.step(Direction::Right, &mut animations);
        assert_eq!(movable.position(), Vector::new(2, 1));
        assert_eq!(movable.draw_position(&animations), Vec2::new(1.0, 1.0));

        animations.advance(Duration::from_millis(50));
        let halfway = movable.draw_position(&animations);
        assert!((halfway.x - 1.5).abs() < 1e-4);

        animations.advance(STEP);
        assert_eq!(movable.draw_position(&animations), Vec2::new(2.0, 1.0));
    }

    #[test]
    fn player_is_not_animating_before_first_step() {
        let mut animations = AnimationSet::default();
        let mut player = Player::new(Vector::new(0, 0), STEP, &mut animations);
        assert!(!player.is_animating(&animations));
        assert_eq!(player.pose(&animations).stance, Stance::Idle);

        player.step(Direction::Up, &mut animations);
        assert!(player.is_animating(&animations));
        assert_eq!(player.pose(&animations).facing, Direction::Up);
        assert_eq!(player.pose(&animations).stance, Stance::LeftLeg);

        animations.advance(STEP);
        assert!(!player.is_animating(&animations));
        assert_eq!(player.pose(&animations).stance, Stance::LeftLeg);

        animations.advance(IDLE_DELAY);
        assert_eq!(player.pose(&animations).stance, Stance::Idle);
    }

    #[test]
    fn player_reset_restores_default_facing() {
        let mut animations = AnimationSet::default();
        let mut player = Player::new(Vector::new(0, 0), STEP, &mut animations);
        player.step(Direction::Left, &mut animations);
        animations.reset_all();
        player.reset();
        assert!(!player.is_animating(&animations));
        assert_eq!(player.pose(&animations).facing, Direction::Down);
    }
}
