//! Link cost table - column-major per-link parameters
//!
//! One column per functional field plus the two host-owned trailing columns
//! (link type and current cost). Missing cells are `None`; the host's
//! sentinel float only exists at the conversion boundary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{FieldId, Variant, VdfError, MISSING_SENTINEL};

/// Decode a host cell
pub fn from_sentinel(value: f64) -> Option<f64> {
    if value == MISSING_SENTINEL || value.is_nan() {
        None
    } else {
        Some(value)
    }
}

/// Encode a cell for the host
pub fn to_sentinel(value: Option<f64>) -> f64 {
    value.unwrap_or(MISSING_SENTINEL)
}

/// Per-field, per-link parameter storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableColumns", into = "TableColumns")]
pub struct LinkTable {
    variant: Variant,
    links: usize,
    columns: Vec<Vec<Option<f64>>>,
    link_type: Vec<Option<f64>>,
    current: Vec<Option<f64>>,
}

impl LinkTable {
    /// Create a table with every cell missing
    pub fn new(variant: Variant, links: usize) -> Self {
        Self {
            variant,
            links,
            columns: vec![vec![None; links]; variant.field_count()],
            link_type: vec![None; links],
            current: vec![None; links],
        }
    }

    /// Build from functional columns in field order
    pub fn from_columns(
        variant: Variant,
        columns: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, VdfError> {
        let fields = variant.fields();
        if columns.len() != fields.len() {
            return Err(VdfError::ColumnLength {
                field: "<columns>".to_string(),
                expected: fields.len(),
                found: columns.len(),
            });
        }

        let links = columns.first().map_or(0, Vec::len);
        for (spec, column) in fields.iter().zip(&columns) {
            if column.len() != links {
                return Err(VdfError::ColumnLength {
                    field: spec.name.to_string(),
                    expected: links,
                    found: column.len(),
                });
            }
        }

        Ok(Self {
            variant,
            links,
            columns,
            link_type: vec![None; links],
            current: vec![None; links],
        })
    }

    /// Build from host arrays: the functional columns, optionally followed by
    /// the link-type and current-cost columns, with missing cells as the sentinel
    pub fn from_host_columns(variant: Variant, columns: &[Vec<f64>]) -> Result<Self, VdfError> {
        let n = variant.field_count();
        if columns.len() != n && columns.len() != n + 2 {
            return Err(VdfError::ColumnLength {
                field: "<columns>".to_string(),
                expected: n + 2,
                found: columns.len(),
            });
        }

        let decode = |col: &Vec<f64>| col.iter().copied().map(from_sentinel).collect::<Vec<_>>();
        let mut table = Self::from_columns(variant, columns[..n].iter().map(decode).collect())?;

        if columns.len() == n + 2 {
            for (name, col) in [("Type", &columns[n]), ("Current", &columns[n + 1])] {
                if col.len() != table.links {
                    return Err(VdfError::ColumnLength {
                        field: name.to_string(),
                        expected: table.links,
                        found: col.len(),
                    });
                }
            }
            table.link_type = decode(&columns[n]);
            table.current = decode(&columns[n + 1]);
        }

        Ok(table)
    }

    /// All columns in host layout, trailing type and current-cost included
    pub fn to_host_columns(&self) -> Vec<Vec<f64>> {
        let encode =
            |col: &Vec<Option<f64>>| -> Vec<f64> { col.iter().copied().map(to_sentinel).collect() };
        self.columns
            .iter()
            .chain([&self.link_type, &self.current])
            .map(encode)
            .collect()
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Number of links
    pub fn len(&self) -> usize {
        self.links
    }

    pub fn is_empty(&self) -> bool {
        self.links == 0
    }

    /// Fail with `LinkNotFound` unless `link` is a valid 0-based index
    pub fn ensure_link(&self, link: usize) -> Result<(), VdfError> {
        if link < self.links {
            Ok(())
        } else {
            Err(VdfError::LinkNotFound {
                link,
                links: self.links,
            })
        }
    }

    /// Cell value; `None` when missing or when the variant has no such field
    pub fn get(&self, id: FieldId, link: usize) -> Option<f64> {
        let index = self.variant.index_of(id)?;
        self.columns[index].get(link).copied().flatten()
    }

    /// Overwrite a cell. Fields the variant lacks are ignored.
    pub fn set(&mut self, id: FieldId, link: usize, value: Option<f64>) {
        if let Some(index) = self.variant.index_of(id) {
            if let Some(cell) = self.columns[index].get_mut(link) {
                *cell = value;
            }
        }
    }

    /// Column at field position `index`
    pub fn column(&self, index: usize) -> &[Option<f64>] {
        &self.columns[index]
    }

    pub(crate) fn cell_mut(&mut self, index: usize, link: usize) -> &mut Option<f64> {
        &mut self.columns[index][link]
    }

    pub fn current_cost(&self, link: usize) -> Option<f64> {
        self.current.get(link).copied().flatten()
    }

    pub(crate) fn set_current_cost(&mut self, link: usize, value: Option<f64>) {
        self.current[link] = value;
    }

    pub fn current_costs(&self) -> &[Option<f64>] {
        &self.current
    }

    pub fn link_type(&self, link: usize) -> Option<f64> {
        self.link_type.get(link).copied().flatten()
    }

    pub fn set_link_type(&mut self, link: usize, value: Option<f64>) {
        if let Some(cell) = self.link_type.get_mut(link) {
            *cell = value;
        }
    }
}

/// Serialized form of a [`LinkTable`]; the link count follows from the columns
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableColumns {
    variant: Variant,
    columns: Vec<Vec<Option<f64>>>,
    #[serde(default)]
    link_type: Vec<Option<f64>>,
    #[serde(default)]
    current: Vec<Option<f64>>,
}

impl TryFrom<TableColumns> for LinkTable {
    type Error = VdfError;

    fn try_from(parts: TableColumns) -> Result<Self, Self::Error> {
        let mut table = LinkTable::from_columns(parts.variant, parts.columns)?;
        for (name, column, target) in [
            ("Type", parts.link_type, &mut table.link_type),
            ("Current", parts.current, &mut table.current),
        ] {
            // an absent trailing column stays all-missing
            if column.is_empty() {
                continue;
            }
            if column.len() != table.links {
                return Err(VdfError::ColumnLength {
                    field: name.to_string(),
                    expected: table.links,
                    found: column.len(),
                });
            }
            *target = column;
        }
        Ok(table)
    }
}

impl From<LinkTable> for TableColumns {
    fn from(table: LinkTable) -> Self {
        Self {
            variant: table.variant,
            columns: table.columns,
            link_type: table.link_type,
            current: table.current,
        }
    }
}

/// One link as written in a JSON link file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Assigned flow to evaluate at
    #[serde(default)]
    pub flow: f64,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub link_type: Option<f64>,
    /// Parameter values keyed by [`FieldId::key`]; absent or null means missing
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

/// A variant plus its links, the interchange form of a [`LinkTable`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkSet {
    #[serde(default)]
    pub variant: Variant,
    pub links: Vec<LinkRecord>,
}

/// A table ready for evaluation together with per-link flows and disabled flags
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedLinks {
    pub table: LinkTable,
    pub flows: Vec<f64>,
    pub disabled: Vec<bool>,
}

impl LinkSet {
    pub fn from_json_str(json: &str) -> Result<Self, VdfError> {
        serde_json::from_str(json).map_err(|e| VdfError::Parse(e.to_string()))
    }

    /// Convert to column-major form, rejecting keys the variant does not carry
    pub fn into_table(self) -> Result<LoadedLinks, VdfError> {
        let mut table = LinkTable::new(self.variant, self.links.len());
        let mut flows = Vec::with_capacity(self.links.len());
        let mut disabled = Vec::with_capacity(self.links.len());

        for (link, record) in self.links.into_iter().enumerate() {
            for (key, value) in record.values {
                let id = FieldId::from_key(&key)
                    .filter(|id| self.variant.index_of(*id).is_some())
                    .ok_or_else(|| VdfError::UnknownField(key.clone()))?;
                table.set(id, link, value);
            }
            table.set_link_type(link, record.link_type);
            flows.push(record.flow);
            disabled.push(record.disabled);
        }

        Ok(LoadedLinks {
            table,
            flows,
            disabled,
        })
    }

    /// Row form of a table, with the given flows and disabled flags
    pub fn from_table(table: &LinkTable, flows: &[f64], disabled: &[bool]) -> Self {
        let variant = table.variant();
        let links = (0..table.len())
            .map(|link| LinkRecord {
                flow: flows.get(link).copied().unwrap_or_default(),
                disabled: disabled.get(link).copied().unwrap_or_default(),
                link_type: table.link_type(link),
                values: variant
                    .fields()
                    .iter()
                    .map(|spec| (spec.id.key().to_string(), table.get(spec.id, link)))
                    .collect(),
            })
            .collect();

        Self { variant, links }
    }
}
