//! Domain types for the Skybook booking core.
//!
//! Value objects, entities, and status enums shared by every crate in the
//! workspace. Identifiers that travel on the wire (flight ids, booking ids,
//! user ids) are opaque string newtypes; generated identifiers carry a prefix
//! so a booking id can never be mistaken for a flight id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix of computed-route identifiers (a synthetic id bundling an ordered
/// sequence of direct flights).
pub const COMPUTED_ROUTE_PREFIX: &str = "CF_";

/// Prefix of generated booking identifiers.
pub const BOOKING_ID_PREFIX: &str = "BK_";

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a direct flight.
///
/// Opaque: the core never parses it, only compares and orders it (the mutex
/// acquires multi-key locks in lexicographic `FlightId` order).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlightId(String);

impl FlightId {
    /// Creates a `FlightId` from an opaque string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking (`BK_`-prefixed, generated).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BookingId(String);

impl BookingId {
    /// Wraps an existing booking identifier (e.g. one read back from storage).
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh booking identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{BOOKING_ID_PREFIX}{}", Uuid::new_v4().simple()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the user owning a booking.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Creates a `UserId`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty (invalid).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identifier a booking request names: either a direct flight id or a
/// `CF_`-prefixed computed-route id.
///
/// The core treats both as opaque; only the prefix is inspected, to record
/// the booking's [`FlightType`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlightIdentifier(String);

impl FlightIdentifier {
    /// Creates a `FlightIdentifier` from an opaque string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty (invalid).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this names a computed route rather than a direct flight.
    #[must_use]
    pub fn is_computed(&self) -> bool {
        self.0.starts_with(COMPUTED_ROUTE_PREFIX)
    }

    /// The booking flight type this identifier implies.
    #[must_use]
    pub fn flight_type(&self) -> FlightType {
        if self.is_computed() {
            FlightType::Computed
        } else {
            FlightType::Direct
        }
    }
}

impl fmt::Display for FlightIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money (cents-based to avoid floating point errors)
// ============================================================================

/// A price in integer cents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents.
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Adds two amounts with overflow checking.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies the amount by a seat count with overflow checking.
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Sums an iterator of amounts, `None` on overflow.
    #[must_use]
    pub fn checked_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self(0), Self::checked_add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Status enums
// ============================================================================

/// Lifecycle status of a flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightStatus {
    /// Flight is scheduled and bookable.
    Active,
    /// Flight was cancelled; no new reservations.
    Cancelled,
}

impl FlightStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(Self::Active),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Lifecycle status of a booking.
///
/// Transitions form a DAG from `Pending` to exactly one terminal state;
/// terminal states never transition again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Created; awaiting the payment outcome.
    Pending,
    /// Payment succeeded and the reservation was confirmed.
    Confirmed,
    /// Payment failed, or the reservation had lapsed by the time the
    /// successful payment arrived.
    Failed,
    /// No payment outcome arrived before the reservation TTL; reconciled by
    /// the background sweep.
    Timeout,
}

impl BookingStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Failed => "FAILED",
            Self::Timeout => "TIMEOUT",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "CONFIRMED" => Some(Self::Confirmed),
            "FAILED" => Some(Self::Failed),
            "TIMEOUT" => Some(Self::Timeout),
            _ => None,
        }
    }

    /// Whether this status is terminal (absorbing).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// How the booking's flight identifier resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightType {
    /// A single scheduled flight.
    Direct,
    /// An ordered multi-leg route behind a synthetic `CF_` identifier.
    Computed,
}

impl FlightType {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "DIRECT",
            Self::Computed => "COMPUTED",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DIRECT" => Some(Self::Direct),
            "COMPUTED" => Some(Self::Computed),
            _ => None,
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A scheduled flight with its authoritative seat counters.
///
/// `available_seats` is mutated only by the inventory engine while holding
/// the per-flight mutex; every other component reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    /// Unique flight identifier.
    pub flight_id: FlightId,
    /// Departure airport code.
    pub source: String,
    /// Arrival airport code.
    pub destination: String,
    /// Scheduled departure.
    pub departure_time: DateTime<Utc>,
    /// Scheduled arrival.
    pub arrival_time: DateTime<Utc>,
    /// Total capacity, immutable after creation.
    pub total_seats: u32,
    /// Seats currently available (`0 ..= total_seats`).
    pub available_seats: u32,
    /// Per-seat price.
    pub price: Money,
    /// Lifecycle status.
    pub status: FlightStatus,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

/// A TTL-bounded hold of seats on one flight for one booking.
///
/// Active while `deleted_at` is `None`; confirm and release both soft-delete
/// the row, the difference being whether the seats return to the flight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatReservation {
    /// Synthetic row identifier.
    pub id: Uuid,
    /// Booking holding the seats.
    pub booking_id: BookingId,
    /// Flight the seats are held on.
    pub flight_id: FlightId,
    /// Number of seats held.
    pub seats: u32,
    /// When the hold lapses.
    pub expires_at: DateTime<Utc>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker; `None` while the hold is active.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SeatReservation {
    /// Creates a fresh, active reservation row.
    #[must_use]
    pub fn new(
        booking_id: BookingId,
        flight_id: FlightId,
        seats: u32,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            flight_id,
            seats,
            expires_at,
            created_at,
            deleted_at: None,
        }
    }

    /// Whether the hold has lapsed at `now` (active rows only; callers filter
    /// soft-deleted rows first).
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A booking and its payment lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier.
    pub booking_id: BookingId,
    /// Owning user.
    pub user_id: UserId,
    /// Direct or computed.
    pub flight_type: FlightType,
    /// The identifier the request named (direct flight id or `CF_` route id).
    pub flight_identifier: FlightIdentifier,
    /// Seats booked on every leg.
    pub no_of_seats: u32,
    /// `unit_price × no_of_seats`.
    pub total_price: Money,
    /// Lifecycle status.
    pub status: BookingStatus,
    /// Client-supplied idempotency key, globally unique when present.
    pub idempotency_key: Option<String>,
    /// Payment processor reference, recorded from the callback.
    pub payment_id: Option<String>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

/// One concrete flight within a booking, in route order.
///
/// `leg_order` starts at 0 and is dense per booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingLeg {
    /// Owning booking.
    pub booking_id: BookingId,
    /// The concrete flight.
    pub flight_id: FlightId,
    /// Position within the route, 0-based.
    pub leg_order: u32,
}

// ============================================================================
// Payment callback
// ============================================================================

/// Terminal outcome reported by the payment processor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    /// Funds captured.
    Success,
    /// Payment declined or errored.
    Failure,
    /// The processor gave up waiting.
    Timeout,
}

/// The callback body the external payment service POSTs back.
///
/// `status` is kept as the raw wire string: unknown values must be logged and
/// ignored rather than rejected, so parsing is deferred to [`Self::outcome`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentCallback {
    /// Booking the payment was for.
    pub booking_id: BookingId,
    /// Payment processor reference.
    pub payment_id: Option<String>,
    /// Raw outcome string (`SUCCESS`, `FAILURE`, `TIMEOUT`, or unknown).
    pub status: String,
    /// Optional human-readable detail.
    pub message: Option<String>,
}

impl PaymentCallback {
    /// Parses the raw status, `None` for unknown values.
    #[must_use]
    pub fn outcome(&self) -> Option<PaymentOutcome> {
        match self.status.as_str() {
            "SUCCESS" => Some(PaymentOutcome::Success),
            "FAILURE" => Some(PaymentOutcome::Failure),
            "TIMEOUT" => Some(PaymentOutcome::Timeout),
            _ => None,
        }
    }
}
