use {
    futures::future::FusedFuture,
    pin_project_lite::pin_project,
    std::{
        future::Future,
        pin::Pin,
        task::{Context, Poll},
    },
};

/// Records how long a future takes from its first poll until it resolves.
///
/// Time spent before the first poll is not counted, so wrapping a future that
/// sits in a queue measures only the work itself.
pub trait Measure: Sized {
    fn measure(self, label: &'static str) -> Measurable<Self> {
        Measurable {
            inner: self,
            label,
            timer: Timer::Idle,
        }
    }
}

impl<T: Future> Measure for T {}

pin_project! {
    #[derive(Debug)]
    #[must_use = "futures do nothing unless you `.await` or poll them"]
    pub struct Measurable<T> {
        #[pin]
        inner: T,
        label: &'static str,
        timer: Timer,
    }
}

#[derive(Debug)]
enum Timer {
    Idle,
    // Held only for its drop side effect.
    Started(#[allow(dead_code)] prometheus::HistogramTimer),
    Stopped,
}

impl<T: Future> Future for Measurable<T> {
    type Output = T::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        if let Timer::Idle = this.timer {
            let histogram = Metrics::get().measured_future_seconds.with_label_values(&[this.label]);
            *this.timer = Timer::Started(histogram.start_timer());
        }
        let output = this.inner.poll(cx);
        if output.is_ready() {
            *this.timer = Timer::Stopped;
        }
        output
    }
}

impl<T: FusedFuture> FusedFuture for Measurable<T> {
    fn is_terminated(&self) -> bool {
        matches!(self.timer, Timer::Stopped)
    }
}

#[derive(prometheus_metric_storage::MetricStorage)]
struct Metrics {
    /// Execution time of measured futures.
    #[metric(labels("label"))]
    measured_future_seconds: prometheus::HistogramVec,
}

impl Metrics {
    fn get() -> &'static Self {
        Metrics::instance(super::metrics::get_storage_registry()).unwrap()
    }
}
