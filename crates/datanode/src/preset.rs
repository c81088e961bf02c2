//! Default schema/template pairs for untyped definitions.
//!
//! The block and inline presets are debug-enabled and render immediately, so
//! an author defining data without a type sees exactly what was captured.

use datanode_render::{Field, Phase, Schema, Template};

/// Admonition listing the name, every attribute and the content.
pub const BLOCK_TEMPLATE: &str = r#".. note:: {{ name or 'Data' }}
{%- for key, value in attrs.items() %}

   :{{ key }}: {{ value }}
{%- endfor %}
{%- if content %}

   Content::

{{ content|indent(6, true) }}
{%- endif %}"#;

/// The content as an inline literal.
pub const INLINE_TEMPLATE: &str = "``{{ content or 'None' }}``";

/// Optional name, any attributes, optional content, all strings.
pub fn block_schema() -> Schema {
    Schema::new()
        .name(Field::str())
        .other_attrs(Field::str())
        .content(Field::str())
}

pub fn block_template() -> Template {
    Template::new(BLOCK_TEMPLATE)
        .phase(Phase::Immediate)
        .debug(true)
}

/// Re-renders a title from the name of the data defined under it.
pub fn title_template() -> Template {
    Template::new("{{ name }}").phase(Phase::PostParse)
}

/// Optional content only.
pub fn inline_schema() -> Schema {
    Schema::new().content(Field::str())
}

pub fn inline_template() -> Template {
    Template::new(INLINE_TEMPLATE)
        .phase(Phase::Immediate)
        .debug(true)
}
