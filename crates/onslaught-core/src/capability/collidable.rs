//! Collision registry keyed by target actor.
//!
//! A collidable actor first configures its body with
//! [`setup_collider`](Collidable::setup_collider), then registers one overlap
//! handler per target. Registering a target again replaces the previous
//! handler and physics registration. A global disabled flag mutes every
//! handler without dropping the registrations.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::actor::{Actor, ActorId, ActorResult};
use crate::host::{BodyShape, CollisionHandle, Host};
use crate::CapabilityError;

/// Handler invoked with the registrant, the host and the other actor.
pub type OverlapHandler<T> = Rc<dyn Fn(&mut T, &mut <T as Actor>::Host, ActorId) -> ActorResult>;

struct Registration<T: Actor> {
    handle: CollisionHandle,
    handler: OverlapHandler<T>,
}

// ---------------------------------------------------------------------------
// ColliderState
// ---------------------------------------------------------------------------

/// State backing [`Collidable`].
pub struct ColliderState<T: Actor> {
    shape: Option<BodyShape>,
    registrations: BTreeMap<ActorId, Registration<T>>,
    disabled: bool,
}

impl<T: Actor> ColliderState<T> {
    pub fn new() -> Self {
        Self {
            shape: None,
            registrations: BTreeMap::new(),
            disabled: false,
        }
    }

    pub fn shape(&self) -> Option<BodyShape> {
        self.shape
    }

    /// Targets with a live registration, in id order.
    pub fn targets(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.registrations.keys().copied()
    }
}

impl<T: Actor> Default for ColliderState<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Actor> fmt::Debug for ColliderState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handles: Vec<(ActorId, CollisionHandle)> = self
            .registrations
            .iter()
            .map(|(target, reg)| (*target, reg.handle))
            .collect();
        f.debug_struct("ColliderState")
            .field("shape", &self.shape)
            .field("registrations", &handles)
            .field("disabled", &self.disabled)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Collidable
// ---------------------------------------------------------------------------

/// An actor that reacts to overlaps with specific targets.
pub trait Collidable: Actor + Sized {
    fn collider(&self) -> &ColliderState<Self>;
    fn collider_mut(&mut self) -> &mut ColliderState<Self>;

    /// Width and height of the actor's display frame.
    fn frame_size(&self) -> (f32, f32);

    /// Assign a body shape centred in the frame, or sitting on its bottom
    /// edge when `bottom_aligned`. May be called again to reshape the body.
    fn setup_collider(
        &mut self,
        host: &mut Self::Host,
        width: f32,
        height: f32,
        circular: bool,
        bottom_aligned: bool,
    ) -> BodyShape {
        let (frame_width, frame_height) = self.frame_size();
        let offset_x = (frame_width - width) / 2.0;
        let mut offset_y = (frame_height - height) / 2.0;
        if bottom_aligned {
            offset_y *= 2.0;
        }
        let shape = if circular {
            BodyShape::Circle {
                radius: width / 2.0,
                offset_x,
                offset_y,
            }
        } else {
            BodyShape::Rect {
                width,
                height,
                offset_x,
                offset_y,
            }
        };
        let id = self.id();
        self.collider_mut().shape = Some(shape);
        host.physics().set_body_shape(id, shape);
        shape
    }

    /// Register `handler` for overlaps with `target`, replacing any earlier
    /// registration for the same target.
    fn add_collision(
        &mut self,
        host: &mut Self::Host,
        target: ActorId,
        handler: impl Fn(&mut Self, &mut Self::Host, ActorId) -> ActorResult + 'static,
    ) -> Result<CollisionHandle, CapabilityError> {
        let id = self.id();
        if self.collider().shape.is_none() {
            return Err(CapabilityError::ColliderNotConfigured { actor: id });
        }
        if let Some(previous) = self.collider_mut().registrations.remove(&target) {
            host.physics().remove_overlap(previous.handle);
        }
        let handle = host.physics().add_overlap(id, target);
        self.collider_mut().registrations.insert(
            target,
            Registration {
                handle,
                handler: Rc::new(handler),
            },
        );
        Ok(handle)
    }

    fn has_collision(&self, target: ActorId) -> bool {
        self.collider().registrations.contains_key(&target)
    }

    /// Remove the registration for `target`. Returns whether one existed.
    fn destroy_collision(&mut self, host: &mut Self::Host, target: ActorId) -> bool {
        match self.collider_mut().registrations.remove(&target) {
            Some(registration) => {
                host.physics().remove_overlap(registration.handle);
                true
            }
            None => false,
        }
    }

    fn destroy_all_collisions(&mut self, host: &mut Self::Host) {
        let registrations = std::mem::take(&mut self.collider_mut().registrations);
        for registration in registrations.into_values() {
            host.physics().remove_overlap(registration.handle);
        }
    }

    fn disable_collisions(&mut self) {
        self.collider_mut().disabled = true;
    }

    fn enable_collisions(&mut self) {
        self.collider_mut().disabled = false;
    }

    fn collisions_enabled(&self) -> bool {
        !self.collider().disabled
    }

    /// Run the handler registered for `other`, if collisions are enabled.
    /// Concrete actors call this from [`Actor::on_overlap`].
    fn dispatch_overlap(&mut self, host: &mut Self::Host, other: ActorId) -> ActorResult {
        if self.collider().disabled {
            return Ok(());
        }
        let handler = match self.collider().registrations.get(&other) {
            Some(registration) => Rc::clone(&registration.handler),
            None => return Ok(()),
        };
        handler(self, host, other)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
