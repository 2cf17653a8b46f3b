use {
    super::ConfigurationError,
    std::time::Duration,
    thiserror::Error,
    tokio::time::Instant,
};

/// The point in time by which an operation has to be done.
///
/// Deadlines are plain values. A child deadline derived from a parent is
/// never later than the parent, so passing a deadline down the call graph can
/// only shrink the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

/// How much of the parent's remaining time a child deadline asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Budget {
    /// A share of the parent's remaining time. Clamped to `[0, 1]`.
    Fraction(f64),
    /// A fixed duration, capped by the parent's remaining time.
    Fixed(Duration),
}

impl Deadline {
    /// Creates a root deadline `total` from now.
    pub fn new(total: Duration) -> Result<Self, ConfigurationError> {
        Self::starting_at(Instant::now(), total)
    }

    /// Creates a root deadline `total` after `start`. The deadline may already
    /// have passed.
    pub fn starting_at(start: Instant, total: Duration) -> Result<Self, ConfigurationError> {
        if total.is_zero() {
            return Err(ConfigurationError::new("deadline budget must be positive"));
        }
        Ok(Self(start + total))
    }

    /// Derives a deadline that is no later than this one.
    pub fn child(self, budget: Budget) -> Self {
        let requested = match budget {
            Budget::Fixed(duration) => duration,
            Budget::Fraction(fraction) => {
                let fraction = if fraction.is_nan() {
                    0.0
                } else {
                    fraction.clamp(0.0, 1.0)
                };
                self.remaining().mul_f64(fraction)
            }
        };
        Self(self.0.min(Instant::now() + requested))
    }

    /// Derives a deadline that expires `buffer` earlier. Used to keep time in
    /// reserve for the work that follows the bounded operation.
    pub fn reduce(self, buffer: Duration) -> Self {
        Self(
            self.0
                .checked_sub(buffer)
                .unwrap_or_else(|| Instant::now().min(self.0)),
        )
    }

    pub fn instant(self) -> Instant {
        self.0
    }

    /// Time left until the deadline, zero once it passed.
    pub fn remaining(self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    pub fn expired(self) -> bool {
        self.remaining().is_zero()
    }

    /// Like [`Deadline::remaining`] but fails once there is no time left.
    pub fn try_remaining(self) -> Result<Duration, DeadlineExceeded> {
        let remaining = self.remaining();
        if remaining.is_zero() {
            Err(DeadlineExceeded)
        } else {
            Ok(remaining)
        }
    }
}

#[derive(Debug, Error)]
#[error("the deadline has been exceeded")]
pub struct DeadlineExceeded;
