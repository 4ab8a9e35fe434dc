// Errores del motor de agrupación.
use thiserror::Error;

/// Tamaños de curso que no admiten grupos de 3 ni de 4.
pub const INFEASIBLE_CLASS_SIZES: [usize; 4] = [0, 1, 2, 5];

#[derive(Debug, Error)]
pub enum GroupingError {
    /// La cantidad de presentes no se puede repartir en grupos de 3 o 4.
    #[error(
        "no se pueden formar grupos de 3 o 4 con {present} estudiantes presentes \
         (tamaños imposibles: {forbidden:?})",
        forbidden = INFEASIBLE_CLASS_SIZES
    )]
    ClassSizeInfeasible { present: usize },

    #[error("la iteración necesita {required} grupos pero sólo hay {available} nombres de grupo configurados")]
    TooManyGroups { required: usize, available: usize },

    /// Etiquetas repetidas (sin importar mayúsculas), vacías o iguales a la
    /// marca de ausencia: el roster no podría distinguir los grupos al releerlo.
    #[error("nombres de grupo inválidos: {0}")]
    InvalidLabels(String),

    #[error("estudiante desconocido '{id}'{}", suggestion_suffix(.suggestion))]
    UnknownStudent { id: String, suggestion: Option<String> },

    /// La forma de grupos no suma la cantidad de presentes (error de integración).
    #[error("la forma de grupos suma {expected} pero hay {present} estudiantes presentes")]
    ShapeMismatch { expected: usize, present: usize },

    #[error("roster inválido: {0}")]
    Roster(String),

    /// La planilla no se pudo abrir o leer. Los fallos al escribir son `Io`.
    #[error("error de planilla: {0}")]
    Spreadsheet(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (¿quisiste decir '{}'?)", s),
        None => String::new(),
    }
}

impl GroupingError {
    /// Nombre corto y estable del tipo de error, usado por la API HTTP.
    pub fn kind(&self) -> &'static str {
        match self {
            GroupingError::ClassSizeInfeasible { .. } => "class_size_infeasible",
            GroupingError::TooManyGroups { .. } => "too_many_groups",
            GroupingError::InvalidLabels(_) => "invalid_labels",
            GroupingError::UnknownStudent { .. } => "unknown_student",
            GroupingError::ShapeMismatch { .. } => "shape_mismatch",
            GroupingError::Roster(_) => "roster",
            GroupingError::Spreadsheet(_) => "spreadsheet",
            GroupingError::Io(_) => "io",
            GroupingError::Json(_) => "json",
        }
    }

    /// True para errores de validación de entrada (el usuario debe corregir el roster).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            GroupingError::ClassSizeInfeasible { .. }
                | GroupingError::TooManyGroups { .. }
                | GroupingError::InvalidLabels(_)
                | GroupingError::UnknownStudent { .. }
                | GroupingError::Roster(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GroupingError>;
