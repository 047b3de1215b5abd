use std::collections::BTreeSet;

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use serde_json::{Map, Value};
use tabled::builder::Builder;
use tabled::settings::Style;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    /// `Label: value` lines
    #[default]
    Text,
    Table,
    Json,
    Yaml,
    Csv,
    /// Issue keys only
    Quiet,
}

pub struct OutputRenderer {
    format: OutputFormat,
}

impl OutputRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn render<T: Serialize>(&self, value: &T) -> Result<()> {
        let json_value = serde_json::to_value(value)?;
        let rendered = self.render_to_string(&json_value)?;
        if !rendered.is_empty() {
            println!("{rendered}");
        }
        Ok(())
    }

    /// Prints a failure line (`ERROR: ...`) in red when colors are enabled.
    pub fn failure(&self, message: &str) {
        println!("{}", format!("ERROR: {message}").red());
    }

    fn render_to_string(&self, value: &Value) -> Result<String> {
        let out = match self.format {
            OutputFormat::Text => Self::render_text(value),
            OutputFormat::Table => match Self::render_table(value) {
                Some(table) => table,
                None => serde_json::to_string_pretty(value)?,
            },
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
            OutputFormat::Yaml => serde_yaml::to_string(value)?.trim_end().to_string(),
            OutputFormat::Csv => match Self::render_csv(value) {
                Some(csv) => csv,
                None => serde_json::to_string_pretty(value)?,
            },
            OutputFormat::Quiet => Self::render_quiet(value),
        };
        Ok(out)
    }

    fn render_text(value: &Value) -> String {
        match value {
            Value::Object(obj) => Self::text_block(obj),
            Value::Array(rows) => rows
                .iter()
                .map(|row| match row {
                    Value::Object(obj) => Self::text_block(obj),
                    other => Self::value_to_string(other),
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
            other => Self::value_to_string(other),
        }
    }

    fn text_block(obj: &Map<String, Value>) -> String {
        obj.iter()
            .map(|(label, value)| format!("{label}: {}", Self::text_value(value)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Lists of scalars read better comma-separated than as JSON.
    fn text_value(value: &Value) -> String {
        match value {
            Value::Array(items) if items.iter().all(|v| !v.is_object() && !v.is_array()) => items
                .iter()
                .map(Self::value_to_string)
                .collect::<Vec<_>>()
                .join(", "),
            other => Self::value_to_string(other),
        }
    }

    fn render_table(value: &Value) -> Option<String> {
        let mut builder = Builder::default();

        if let Value::Object(obj) = value {
            builder.push_record(["field", "value"]);
            for (key, val) in obj {
                builder.push_record([key.clone(), Self::text_value(val)]);
            }
        } else {
            let (headers, rows) = Self::coerce_rows(value)?;
            builder.push_record(headers);
            for row in rows {
                builder.push_record(row);
            }
        }

        Some(builder.build().with(Style::rounded()).to_string())
    }

    fn render_csv(value: &Value) -> Option<String> {
        let (headers, rows) = Self::coerce_rows(value)?;

        let mut lines = vec![headers.join(",")];
        lines.extend(rows.into_iter().map(|row| row.join(",")));
        Some(lines.join("\n"))
    }

    fn render_quiet(value: &Value) -> String {
        let rows: Vec<&Value> = match value {
            Value::Array(rows) => rows.iter().collect(),
            Value::Null => Vec::new(),
            other => vec![other],
        };

        rows.into_iter()
            .filter_map(|row| match row {
                Value::Object(obj) => Self::key_of(obj).map(Self::value_to_string),
                Value::Null => None,
                other => Some(Self::value_to_string(other)),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn key_of(obj: &Map<String, Value>) -> Option<&Value> {
        obj.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("key"))
            .map(|(_, value)| value)
    }

    fn coerce_rows(value: &Value) -> Option<(Vec<String>, Vec<Vec<String>>)> {
        let rows = match value {
            Value::Array(rows) if !rows.is_empty() => rows,
            _ => return None,
        };

        let mut headers = BTreeSet::new();
        for row in rows {
            if let Value::Object(obj) = row {
                headers.extend(obj.keys().cloned());
            }
        }

        if headers.is_empty() {
            return None;
        }

        let headers_vec: Vec<String> = headers.into_iter().collect();
        let mut data = Vec::with_capacity(rows.len());
        for row in rows {
            let mut record = Vec::with_capacity(headers_vec.len());
            if let Value::Object(obj) = row {
                for header in &headers_vec {
                    let cell = obj
                        .get(header)
                        .map(Self::value_to_string)
                        .unwrap_or_default();
                    record.push(cell);
                }
            }
            data.push(record);
        }

        Some((headers_vec, data))
    }

    fn value_to_string(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }
}
