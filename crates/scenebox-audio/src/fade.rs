//! Timer-driven linear gain ramps.

use crate::graph::AudioParam;
use scenebox_core::{Result, SceneboxError};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{interval, MissedTickBehavior};
use tracing::trace;

/// Which bound a fade heads for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    /// Towards 0.
    Out,
    /// Towards 1.
    In,
}

impl FadeDirection {
    fn target(self) -> f32 {
        match self {
            FadeDirection::Out => 0.0,
            FadeDirection::In => 1.0,
        }
    }
}

/// Gain change per tick: `(tick / duration) * 10`.
pub fn fade_step(tick: Duration, duration: Duration) -> f32 {
    let duration_ms = duration.as_secs_f32() * 1000.0;
    if duration_ms <= 0.0 {
        return 1.0;
    }
    (tick.as_secs_f32() * 1000.0 / duration_ms) * 10.0
}

/// A running fade. Resolves `true` once the bound is reached, `false` if the
/// fade was superseded or its parameter disappeared.
#[derive(Debug)]
pub struct Fade {
    handle: JoinHandle<bool>,
}

impl Fade {
    pub(crate) fn start(
        param: AudioParam,
        direction: FadeDirection,
        duration: Duration,
        tick: Duration,
    ) -> Result<Self> {
        if tick.is_zero() {
            return Err(SceneboxError::InvalidParameter(
                "fade tick must be positive".into(),
            ));
        }
        let runtime = Handle::try_current()
            .map_err(|e| SceneboxError::Runtime(format!("fades need a tokio runtime: {e}")))?;
        let step = fade_step(tick, duration);
        let target = direction.target();
        let handle = runtime.spawn(async move {
            let mut ticker = interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(value) = param.get() else {
                    return false;
                };
                let next = match direction {
                    FadeDirection::Out if value <= target => None,
                    FadeDirection::In if value >= target => None,
                    FadeDirection::Out => Some((value - step).max(target)),
                    FadeDirection::In => Some((value + step).min(target)),
                };
                match next {
                    Some(next) => param.set_value(next),
                    None => {
                        param.set_value(target);
                        trace!(?direction, "Fade complete");
                        return true;
                    }
                }
            }
        });
        Ok(Self { handle })
    }

    pub(crate) fn abort_handle(&self) -> AbortHandle {
        self.handle.abort_handle()
    }

    /// Stop the ramp where it is.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for Fade {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        Pin::new(&mut self.handle)
            .poll(cx)
            .map(|joined| joined.unwrap_or(false))
    }
}
