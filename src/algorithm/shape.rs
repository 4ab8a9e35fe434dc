// Cálculo de la forma de los grupos (cuántos de 3 y cuántos de 4).
use crate::error::{GroupingError, Result};
use crate::models::GroupShape;

/// Reparte `n` estudiantes en grupos de 3 y 4 con la mayor cantidad posible
/// de grupos de 3: se prueba `b` (grupos de 4) desde 0 y se acepta el primero
/// que deja un resto divisible por 3.
///
/// `n` en {0, 1, 2, 5} no tiene solución y devuelve `ClassSizeInfeasible`.
pub fn solve_shape(n: usize) -> Result<GroupShape> {
    if n > 0 {
        let mut fours = 0;
        while fours * 4 <= n {
            let rest = n - fours * 4;
            if rest % 3 == 0 {
                return Ok(GroupShape { threes: rest / 3, fours });
            }
            fours += 1;
        }
    }
    Err(GroupingError::ClassSizeInfeasible { present: n })
}
