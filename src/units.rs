#![allow(missing_docs)]

//! This module defines the quantity types flowing through the projection
//! pipeline and their conversions. Shares, rates and efficiencies are plain
//! `f64` fractions.

macro_rules! unit_struct {
    ($name:ident) => {
        /// Represents a type of quantity.
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            serde::Serialize,
            serde::Deserialize,
            derive_more::Add,
            derive_more::Sub,
        )]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new instance of the unit type from a f64 value.
            pub fn from(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }
        }

        impl std::ops::Mul<f64> for $name {
            type Output = $name;
            fn mul(self, rhs: f64) -> $name {
                $name::from(self.0 * rhs)
            }
        }

        impl std::ops::Mul<$name> for f64 {
            type Output = $name;
            fn mul(self, rhs: $name) -> $name {
                $name::from(self * rhs.0)
            }
        }

        impl std::ops::Div<f64> for $name {
            type Output = $name;
            fn div(self, rhs: f64) -> $name {
                $name::from(self.0 / rhs)
            }
        }

        impl std::ops::AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|v| v.0).sum())
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::from(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::from(self.0 * lhs.0)
            }
        }
    };
}

// Base quantities
unit_struct!(Area);
unit_struct!(Energy);

// Derived quantities
unit_struct!(EnergyPerArea);

// Multiplication rules
impl_mul!(EnergyPerArea, Area, Energy);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intensity_times_area() {
        let energy = EnergyPerArea::from(150.0) * Area::from(100.0);
        assert_eq!(energy, Energy::from(15_000.0));
    }

    #[test]
    fn test_scaling_and_sum() {
        let total: Energy = [Energy::from(1.0) * 2.0, Energy::from(3.0) / 2.0]
            .into_iter()
            .sum();
        assert_eq!(total, Energy::from(3.5));
    }
}
