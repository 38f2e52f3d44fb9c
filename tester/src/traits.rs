use rand::{Rng, SeedableRng};

/// deterministically applies an operation to a T returning the result
pub trait Operation<T> {
    type Result: Sized;
    fn apply(&self, target: &mut T) -> Self::Result;
}

// deterministically generates a sequence of valid operations along with the
// result a correct target must produce for each of them
pub trait OperationGenerator<R>: Iterator<Item = (Self::Operation, Self::Expected)> + Sized
where
    R: Rng + SeedableRng,
{
    type Operation;
    type Expected;
    type ReferenceImpl;
    fn from_seed(seed: R::Seed) -> Self;
    fn reference(&self) -> &Self::ReferenceImpl;
}
