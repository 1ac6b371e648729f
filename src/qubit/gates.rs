use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt;

use nalgebra::{Matrix2, Vector2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::error::{QubitError, QubitResult};

/// Однокубитные гейты
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gate {
    /// Адамар: (a0+a1)/√2, (a0-a1)/√2
    H,
    /// Паули-X: обмен амплитуд
    X,
    /// Паули-Z: смена знака a1
    Z,
}

impl Gate {
    pub const ALL: [Gate; 3] = [Gate::H, Gate::X, Gate::Z];

    pub fn from_symbol(symbol: char) -> QubitResult<Self> {
        match symbol {
            'H' => Ok(Gate::H),
            'X' => Ok(Gate::X),
            'Z' => Ok(Gate::Z),
            _ => Err(QubitError::UnsupportedGate(symbol)),
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Gate::H => 'H',
            Gate::X => 'X',
            Gate::Z => 'Z',
        }
    }

    /// Унитарная матрица гейта
    pub fn matrix(self) -> Matrix2<Complex64> {
        let one = Complex64::new(1.0, 0.0);
        let zero = Complex64::new(0.0, 0.0);
        match self {
            Gate::H => {
                let s = Complex64::new(FRAC_1_SQRT_2, 0.0);
                Matrix2::new(s, s, s, -s)
            }
            Gate::X => Matrix2::new(zero, one, one, zero),
            Gate::Z => Matrix2::new(one, zero, zero, -one),
        }
    }

    /// Чистое преобразование (a0, a1) -> (a0', a1')
    pub fn apply(self, amplitude0: Complex64, amplitude1: Complex64) -> (Complex64, Complex64) {
        let evolved = self.matrix() * Vector2::new(amplitude0, amplitude1);
        (evolved[0], evolved[1])
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
