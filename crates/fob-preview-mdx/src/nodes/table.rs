use anyhow::Result;
use markdown::mdast::{AlignKind, Node, Table, TableRow};

use super::children_to_js;
use crate::codegen::{CodegenContext, JsValue, Prop, Tag, render_element};

/// The first row becomes `thead`, the rest `tbody`.
pub fn table_to_js(table: &Table, ctx: &mut CodegenContext) -> Result<JsValue> {
    let rows: Vec<&TableRow> = table
        .children
        .iter()
        .filter_map(|node| match node {
            Node::TableRow(row) => Some(row),
            _ => None,
        })
        .collect();

    let mut sections = Vec::new();

    if let Some((head, body)) = rows.split_first() {
        let head_row = row_to_js(head, "th", &table.align, ctx)?;
        sections.push(render_element(ctx, Tag::Markdown("thead"), vec![], vec![head_row]));

        if !body.is_empty() {
            let mut body_rows = Vec::with_capacity(body.len());
            for row in body {
                body_rows.push(row_to_js(row, "td", &table.align, ctx)?);
            }
            sections.push(render_element(ctx, Tag::Markdown("tbody"), vec![], body_rows));
        }
    }

    Ok(render_element(ctx, Tag::Markdown("table"), vec![], sections))
}

fn row_to_js(
    row: &TableRow,
    cell_tag: &str,
    align: &[AlignKind],
    ctx: &mut CodegenContext,
) -> Result<JsValue> {
    let mut cells = Vec::with_capacity(row.children.len());
    for (column, cell) in row.children.iter().enumerate() {
        let Node::TableCell(cell) = cell else { continue };
        let text_align = match align.get(column) {
            Some(AlignKind::Left) => Some("left"),
            Some(AlignKind::Right) => Some("right"),
            Some(AlignKind::Center) => Some("center"),
            _ => None,
        };
        let props = text_align
            .map(|value| vec![Prop::expr("style", format!("{{textAlign: \"{}\"}}", value))])
            .unwrap_or_default();
        let children = children_to_js(&cell.children, ctx)?;
        cells.push(render_element(ctx, Tag::Markdown(cell_tag), props, children));
    }
    Ok(render_element(ctx, Tag::Markdown("tr"), vec![], cells))
}
