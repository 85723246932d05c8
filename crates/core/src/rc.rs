//! Reference-counting disciplines
//!
//! Every tandem value shares its payload through a reference-counted pointer.
//! Which pointer is used is a policy parameter on the value type rather than a
//! separate family of types:
//!
//! ```text
//! Builder<Safe>   ─┐                      ┌─ Arc<Payload<Safe>>   (atomic count)
//! Buffer<Safe>    ─┼─ RawValue<Safe>   ───┘
//! Hybrid<Safe>    ─┘
//!
//! Builder<Unsafe> ─┐                      ┌─ Rc<Payload<Unsafe>>  (plain count)
//! Buffer<Unsafe>  ─┼─ RawValue<Unsafe> ───┘
//! Hybrid<Unsafe>  ─┘
//! ```
//!
//! `Unsafe` values are `!Send` and `!Sync`, so sharing them across threads is
//! rejected at compile time instead of becoming a counter race.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use std::sync::Arc;

/// Runtime tag for a refcount discipline, as stamped into handle headers.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefcountDiscipline {
    /// Atomic read-modify-write on the shared count
    Safe = 0,
    /// Plain read-modify-write on the shared count (single thread only)
    Unsafe = 1,
}

impl RefcountDiscipline {
    /// Decode a raw header tag
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(RefcountDiscipline::Safe),
            1 => Some(RefcountDiscipline::Unsafe),
            _ => None,
        }
    }

    /// Raw header tag
    #[inline(always)]
    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for RefcountDiscipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefcountDiscipline::Safe => write!(f, "safe"),
            RefcountDiscipline::Unsafe => write!(f, "unsafe"),
        }
    }
}

/// A reference-counting policy.
///
/// Implemented by the two marker types [`Safe`] and [`Unsafe`]. The policy
/// picks the shared pointer and reports the discipline tag that the handle
/// layer stamps for values using it.
pub trait RcPolicy: Sized + 'static {
    /// Tag stamped into handle headers for values under this policy
    const DISCIPLINE: RefcountDiscipline;

    /// Shared pointer used for payloads
    type Ptr<T>: Clone + Deref<Target = T>;

    /// Allocate a new shared payload with a count of one
    fn new<T>(value: T) -> Self::Ptr<T>;

    /// Current strong count
    fn strong_count<T>(this: &Self::Ptr<T>) -> usize;

    /// Whether both pointers share one allocation
    fn ptr_eq<T>(a: &Self::Ptr<T>, b: &Self::Ptr<T>) -> bool;

    /// Mutable access, cloning the payload first if it is shared
    fn make_mut<T: Clone>(this: &mut Self::Ptr<T>) -> &mut T;
}

/// Atomic reference counting (`Arc`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Safe;

/// Non-atomic reference counting (`Rc`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Unsafe;

impl RcPolicy for Safe {
    const DISCIPLINE: RefcountDiscipline = RefcountDiscipline::Safe;

    type Ptr<T> = Arc<T>;

    #[inline]
    fn new<T>(value: T) -> Arc<T> {
        Arc::new(value)
    }

    #[inline]
    fn strong_count<T>(this: &Arc<T>) -> usize {
        Arc::strong_count(this)
    }

    #[inline]
    fn ptr_eq<T>(a: &Arc<T>, b: &Arc<T>) -> bool {
        Arc::ptr_eq(a, b)
    }

    #[inline]
    fn make_mut<T: Clone>(this: &mut Arc<T>) -> &mut T {
        Arc::make_mut(this)
    }
}

impl RcPolicy for Unsafe {
    const DISCIPLINE: RefcountDiscipline = RefcountDiscipline::Unsafe;

    type Ptr<T> = Rc<T>;

    #[inline]
    fn new<T>(value: T) -> Rc<T> {
        Rc::new(value)
    }

    #[inline]
    fn strong_count<T>(this: &Rc<T>) -> usize {
        Rc::strong_count(this)
    }

    #[inline]
    fn ptr_eq<T>(a: &Rc<T>, b: &Rc<T>) -> bool {
        Rc::ptr_eq(a, b)
    }

    #[inline]
    fn make_mut<T: Clone>(this: &mut Rc<T>) -> &mut T {
        Rc::make_mut(this)
    }
}
