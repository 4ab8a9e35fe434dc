//! Roster persistido en una planilla `.xlsx`.
//!
//! Formato: primera hoja, fila de encabezados, una columna `Roster` (clave del
//! estudiante), una columna `Name` y una columna `Iteration N` por iteración.
//! Cada celda de iteración tiene la etiqueta del grupo, la marca de ausencia
//! o nada. Si faltan los encabezados `Roster`/`Name` se usan las dos primeras
//! columnas.
//!
//! Al guardar se relee el libro y sólo se reescriben los encabezados y las
//! columnas de iteración (como texto). Las demás columnas, con su tipo y
//! formato, y las otras hojas quedan como estaban.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_ABSENT_MARKER;
use crate::error::{GroupingError, Result};
use crate::excel::io::{SheetRows, iteration_number, normalize_header, read_first_sheet};
use crate::models::{Cell, IterationRecord, Student, StudentId};
use crate::roster::{RosterStore, iteration_header};

const DEFAULT_SHEET: &str = "Roster";

#[derive(Debug, Clone)]
pub struct SpreadsheetRoster {
    path: PathBuf,
    sheet_name: String,
    /// Esquina superior izquierda de la tabla en la hoja (base 0).
    origin: (u32, u32),
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    /// Fila de cada estudiante relativa al encabezado (las filas vacías se saltan).
    row_offsets: Vec<u32>,
    key_col: usize,
    name_col: usize,
    absent_marker: String,
}

impl SpreadsheetRoster {
    /// Abre un roster existente.
    pub fn open<P: AsRef<Path>>(path: P, absent_marker: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let SheetRows { name: sheet_name, origin, mut rows } = read_first_sheet(&path)?;
        if rows.is_empty() {
            return Err(GroupingError::Roster(format!("'{}' está vacío", path.display())));
        }
        let headers: Vec<String> = rows.remove(0);
        if headers.len() < 2 {
            return Err(GroupingError::Roster("se necesitan al menos las columnas Roster y Name".to_string()));
        }

        let find = |names: &[&str]| headers.iter().position(|h| names.contains(&normalize_header(h).as_str()));
        let key_col = find(&["roster"]).unwrap_or(0);
        let name_col = find(&["name", "nombre"]).unwrap_or(if key_col == 1 { 0 } else { 1 });

        let width = headers.len();
        let mut seen: HashSet<String> = HashSet::new();
        let mut kept = Vec::with_capacity(rows.len());
        let mut row_offsets = Vec::with_capacity(rows.len());
        for (i, mut row) in rows.into_iter().enumerate() {
            row.resize(width, String::new());
            if row.iter().all(|c| c.is_empty()) {
                continue;
            }
            let key = row[key_col].clone();
            if key.is_empty() {
                return Err(GroupingError::Roster(format!("la fila {} no tiene clave de roster", origin.0 as usize + i + 2)));
            }
            if !seen.insert(key.clone()) {
                return Err(GroupingError::Roster(format!("clave de roster duplicada '{}'", key)));
            }
            kept.push(row);
            row_offsets.push(i as u32 + 1);
        }

        tracing::debug!(path = %path.display(), students = kept.len(), "roster leído");
        Ok(SpreadsheetRoster {
            path,
            sheet_name,
            origin,
            headers,
            rows: kept,
            row_offsets,
            key_col,
            name_col,
            absent_marker: absent_marker.to_string(),
        })
    }

    /// Crea un roster nuevo sin iteraciones y lo escribe en disco (reemplaza
    /// el archivo si ya existe).
    pub fn create<P: AsRef<Path>>(path: P, students: &[Student]) -> Result<Self> {
        let roster = SpreadsheetRoster {
            path: path.as_ref().to_path_buf(),
            sheet_name: DEFAULT_SHEET.to_string(),
            origin: (0, 0),
            headers: vec!["Roster".to_string(), "Name".to_string()],
            rows: students.iter().map(|s| vec![s.id.clone(), s.name.clone()]).collect(),
            row_offsets: (1..=students.len() as u32).collect(),
            key_col: 0,
            name_col: 1,
            absent_marker: DEFAULT_ABSENT_MARKER.to_string(),
        };
        roster.write_book(umya_spreadsheet::new_file_empty_worksheet(), true)?;
        Ok(roster)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_absent_marker(&mut self, marker: &str) {
        self.absent_marker = marker.to_string();
    }

    /// Marca ausente a un estudiante en la columna de la iteración (en memoria).
    pub fn mark_absent(&mut self, iteration: usize, id: &str) -> Result<()> {
        let row = self
            .rows
            .iter()
            .position(|r| r[self.key_col] == id)
            .ok_or_else(|| crate::algorithm::history::unknown_student(id, self.keys()))?;
        let col = self.ensure_column(iteration);
        self.rows[row][col] = self.absent_marker.clone();
        Ok(())
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r[self.key_col].as_str())
    }

    fn is_absent(&self, value: &str) -> bool {
        value.trim().eq_ignore_ascii_case(&self.absent_marker)
    }

    /// Columnas de iteración ordenadas por número: (número, índice de columna).
    fn iteration_columns(&self) -> Vec<(usize, usize)> {
        let mut cols: Vec<(usize, usize)> = self
            .headers
            .iter()
            .enumerate()
            .filter_map(|(c, h)| iteration_number(h).map(|n| (n, c)))
            .collect();
        cols.sort();
        cols
    }

    fn column_of(&self, iteration: usize) -> Option<usize> {
        self.iteration_columns().into_iter().find(|(n, _)| *n == iteration).map(|(_, c)| c)
    }

    fn ensure_column(&mut self, iteration: usize) -> usize {
        if let Some(c) = self.column_of(iteration) {
            return c;
        }
        self.headers.push(iteration_header(iteration));
        for row in self.rows.iter_mut() {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    fn column_has_groups(&self, col: usize) -> bool {
        self.rows.iter().any(|r| !r[col].is_empty() && !self.is_absent(&r[col]))
    }

    /// Guarda el roster sobre el libro existente (ver el doc del módulo).
    pub fn save(&self) -> Result<()> {
        if !self.path.exists() {
            return self.write_book(umya_spreadsheet::new_file_empty_worksheet(), true);
        }
        let book = umya_spreadsheet::reader::xlsx::read(&self.path).map_err(|e| write_error(&self.path, e))?;
        self.write_book(book, false)
    }

    /// Vuelca la tabla en `book` y lo escribe en un archivo temporal que luego
    /// se renombra. Con `full` se escriben todas las columnas; si no, sólo los
    /// encabezados y las columnas de iteración.
    fn write_book(&self, mut book: umya_spreadsheet::Spreadsheet, full: bool) -> Result<()> {
        if book.get_sheet_by_name(&self.sheet_name).is_none() {
            book.new_sheet(self.sheet_name.as_str()).map_err(|e| write_error(&self.path, e))?;
        }
        let sheet = book
            .get_sheet_by_name_mut(&self.sheet_name)
            .ok_or_else(|| write_error(&self.path, format!("falta la hoja '{}'", self.sheet_name)))?;

        let (top, left) = self.origin;
        for (c, header) in self.headers.iter().enumerate() {
            if !full && iteration_number(header).is_none() {
                continue;
            }
            let col = left + c as u32 + 1;
            put_text(sheet, (col, top + 1), header);
            for (offset, row) in self.row_offsets.iter().zip(self.rows.iter()) {
                put_text(sheet, (col, top + offset + 1), &row[c]);
            }
        }

        let tmp = self.path.with_extension("xlsx.tmp");
        umya_spreadsheet::writer::xlsx::write(&book, &tmp).map_err(|e| write_error(&tmp, e))?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), full, "roster guardado");
        Ok(())
    }
}

/// Escribe texto en la celda; una celda vacía sólo se toca si ya existía.
fn put_text(sheet: &mut umya_spreadsheet::Worksheet, coord: (u32, u32), value: &str) {
    if !value.is_empty() || sheet.get_cell(coord).is_some() {
        sheet.get_cell_mut(coord).set_value_string(value);
    }
}

/// Fallar al escribir es un problema del servidor, no del roster.
fn write_error(path: &Path, e: impl std::fmt::Display) -> GroupingError {
    GroupingError::Io(std::io::Error::other(format!("no se pudo escribir '{}': {}", path.display(), e)))
}

impl RosterStore for SpreadsheetRoster {
    fn list_students(&self) -> Vec<Student> {
        self.rows
            .iter()
            .map(|r| Student::new(r[self.key_col].clone(), r[self.name_col].clone()))
            .collect()
    }

    fn pending_iteration(&mut self) -> Result<usize> {
        let cols = self.iteration_columns();
        if let Some((n, _)) = cols.iter().find(|(_, c)| !self.column_has_groups(*c)) {
            return Ok(*n);
        }
        let next = cols.last().map_or(1, |(n, _)| n + 1);
        self.ensure_column(next);
        Ok(next)
    }

    fn absence_markers_for(&self, iteration: usize) -> Result<BTreeSet<StudentId>> {
        let Some(col) = self.column_of(iteration) else {
            return Ok(BTreeSet::new());
        };
        Ok(self
            .rows
            .iter()
            .filter(|r| self.is_absent(&r[col]))
            .map(|r| r[self.key_col].clone())
            .collect())
    }

    fn record_iteration(&mut self, record: &IterationRecord) -> Result<()> {
        let headers_before = self.headers.len();
        let col = self.ensure_column(record.index);
        let previous: Vec<String> = self.rows.iter().map(|r| r[col].clone()).collect();

        for row in self.rows.iter_mut() {
            row[col] = match record.cells.get(&row[self.key_col]) {
                Some(Cell::Group(label)) => label.clone(),
                Some(Cell::Absent) => self.absent_marker.clone(),
                Some(Cell::Blank) | None => String::new(),
            };
        }

        if let Err(e) = self.save() {
            // deshacer en memoria para que el roster siga igual que en disco
            for (row, old) in self.rows.iter_mut().zip(previous) {
                row[col] = old;
            }
            if self.headers.len() > headers_before {
                self.headers.truncate(headers_before);
                for row in self.rows.iter_mut() {
                    row.truncate(headers_before);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    fn absence_marker(&self) -> Option<&str> {
        Some(&self.absent_marker)
    }

    fn recorded_iterations(&self) -> Result<Vec<IterationRecord>> {
        let mut out = Vec::new();
        for (n, col) in self.iteration_columns() {
            if !self.column_has_groups(col) {
                continue;
            }
            let mut cells: BTreeMap<StudentId, Cell> = BTreeMap::new();
            for r in self.rows.iter() {
                let v = &r[col];
                let cell = if v.is_empty() {
                    Cell::Blank
                } else if self.is_absent(v) {
                    Cell::Absent
                } else {
                    Cell::Group(v.clone())
                };
                cells.insert(r[self.key_col].clone(), cell);
            }
            out.push(IterationRecord { index: n, header: self.headers[col].clone(), cells });
        }
        Ok(out)
    }
}
