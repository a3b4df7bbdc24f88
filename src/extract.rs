use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};

use crate::config::Selectors;
use crate::dataset::Device;

/// Compiled selectors describing where records live in the source DOM.
/// Headings name categories; the first row-bearing sibling after a heading
/// holds that category's rows. Within a row, cell order is the contract:
/// first cell is the name, second is the based-on reference.
pub struct PageShape {
    heading: Selector,
    row: Selector,
    cell: Selector,
}

impl PageShape {
    pub fn new(selectors: &Selectors) -> Result<Self> {
        Ok(Self {
            heading: parse_selector(&selectors.heading, "heading")?,
            row: parse_selector(&selectors.row, "row")?,
            cell: parse_selector(&selectors.cell, "cell")?,
        })
    }
}

fn parse_selector(css: &str, role: &str) -> Result<Selector> {
    // The parse error borrows the input, so flatten it here.
    Selector::parse(css).map_err(|e| anyhow!("invalid {role} selector {css:?}: {e}"))
}

/// Extract every device record from a rendered document, heading by heading
/// in document order. Pure: same document in, same records out.
pub fn devices(doc: &Html, shape: &PageShape) -> Vec<Device> {
    let mut out = Vec::new();
    for heading in doc.select(&shape.heading) {
        let category = element_text(heading);
        if category.is_empty() {
            continue;
        }
        if let Some(container) = row_container(heading, shape) {
            for row in container.select(&shape.row) {
                if let Some(device) = device_from_row(row, &category, shape) {
                    out.push(device);
                }
            }
        }
    }
    out
}

/// Walk the heading's following siblings and return the first element that
/// contains at least one row. Stops empty-handed at the next heading or at
/// the end of the sibling list.
fn row_container<'a>(heading: ElementRef<'a>, shape: &PageShape) -> Option<ElementRef<'a>> {
    let mut node = heading.next_sibling();
    while let Some(n) = node {
        if let Some(el) = ElementRef::wrap(n) {
            if shape.heading.matches(&el) {
                return None; // next section starts; this category has no rows
            }
            if el.select(&shape.row).next().is_some() {
                return Some(el);
            }
        }
        node = n.next_sibling();
    }
    None
}

/// A row needs at least two cells and a non-empty name cell; anything else
/// is layout noise and yields no record.
fn device_from_row(row: ElementRef<'_>, category: &str, shape: &PageShape) -> Option<Device> {
    let mut cells = row.select(&shape.cell);
    let name = element_text(cells.next()?);
    let based_on = element_text(cells.next()?);
    if name.is_empty() {
        return None;
    }
    Some(Device {
        category: category.to_string(),
        name,
        based_on,
    })
}

/// Text content with whitespace runs collapsed to single spaces and the
/// ends trimmed.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ──
