use std::marker::PhantomData;

use async_trait::async_trait;
use ractor::{Actor, ActorCell, ActorProcessingErr, ActorRef, Message, SpawnErr};

/// Spawn a small actor that forwards every message it receives to `to`,
/// mapped through `map`. Used to subscribe an actor to a publisher whose
/// event type differs from the subscriber's own message type.
pub async fn forward<A, B, F>(
    to: ActorRef<B>,
    map: F,
    supervisor: ActorCell,
) -> Result<ActorRef<A>, SpawnErr>
where
    A: Message,
    B: Message,
    F: Fn(A) -> B + Send + Sync + 'static,
{
    let (actor_ref, _) = Actor::spawn_linked(
        None,
        Forward {
            to,
            map,
            marker: PhantomData,
        },
        (),
        supervisor,
    )
    .await?;

    Ok(actor_ref)
}

struct Forward<A, B, F> {
    to: ActorRef<B>,
    map: F,
    marker: PhantomData<fn(A) -> B>,
}

#[async_trait]
impl<A, B, F> Actor for Forward<A, B, F>
where
    A: Message,
    B: Message,
    F: Fn(A) -> B + Send + Sync + 'static,
{
    type Msg = A;
    type State = ();
    type Arguments = ();

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        _args: (),
    ) -> Result<(), ActorProcessingErr> {
        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        msg: A,
        _state: &mut (),
    ) -> Result<(), ActorProcessingErr> {
        self.to.cast((self.map)(msg))?;
        Ok(())
    }
}
