//! Parse, transform and generate a document module.

use markdown::mdast::Node;

use crate::codegen::{CodegenContext, DEFAULT_COMPONENTS, JsValue, JsxFlavor, Tag, render_element};
use crate::error::MdxError;
use crate::options::{LEGACY_PRAGMA_SOURCE, MdxCompileOptions};
use crate::{csf, esm, nodes};

/// Documents above this size are rejected before parsing.
const MAX_MDX_SIZE: usize = 10 * 1024 * 1024;

fn parse_options(options: &MdxCompileOptions) -> markdown::ParseOptions {
    let mut parse_options = markdown::ParseOptions::mdx();
    parse_options.mdx_esm_parse = Some(Box::new(esm::validate_esm));
    parse_options.constructs.frontmatter = true;

    if options.gfm {
        parse_options.constructs.gfm_strikethrough = true;
        parse_options.constructs.gfm_table = true;
        parse_options.constructs.gfm_task_list_item = true;
        parse_options.constructs.gfm_autolink_literal = true;
    }
    if options.footnotes {
        parse_options.constructs.gfm_footnote_definition = true;
        parse_options.constructs.gfm_label_start_footnote = true;
    }
    if options.math {
        parse_options.constructs.math_text = true;
        parse_options.constructs.math_flow = true;
    }

    parse_options
}

/// Parse a document into mdast.
pub fn parse(source: &str, options: &MdxCompileOptions) -> Result<Node, MdxError> {
    if source.len() > MAX_MDX_SIZE {
        return Err(MdxError::new(format!(
            "MDX source exceeds maximum size of {} MB",
            MAX_MDX_SIZE / 1024 / 1024
        ))
        .in_file(options.filepath.as_deref()));
    }

    markdown::to_mdast(source, &parse_options(options))
        .map_err(|e| MdxError::parse_error(e.to_string()).in_file(options.filepath.as_deref()))
}

/// Compile a document with the given flavor.
pub(crate) fn compile_document(
    source: &str,
    options: &MdxCompileOptions,
    flavor: JsxFlavor,
) -> Result<String, MdxError> {
    let file = options.filepath.as_deref();
    let mut root = parse(source, options)?;

    for plugin in &options.plugins {
        tracing::debug!(plugin = plugin.name(), "Running MDX AST plugin");
        plugin
            .transform_ast(&mut root)
            .map_err(|e| MdxError::plugin_error(plugin.name(), &e).in_file(file))?;
    }

    let esm = esm::collect_esm(&root);
    let stories = if options.skip_csf {
        None
    } else {
        Some(csf::extract(&mut root).map_err(|e| MdxError::conversion_error(&e).in_file(file))?)
    };

    let mut ctx = CodegenContext::new(flavor);
    ctx.bindings = esm.bindings.clone();

    let top_level: &[Node] = root.children().map(Vec::as_slice).unwrap_or(&[]);
    let content =
        nodes::children_to_js(top_level, &mut ctx).map_err(|e| MdxError::conversion_error(&e).in_file(file))?;

    let glue = match &stories {
        Some(doc) => csf::render(doc, &mut ctx).map_err(|e| MdxError::conversion_error(&e).in_file(file))?,
        None => "export default MDXContent;\n".to_string(),
    };

    let mut output = match flavor {
        JsxFlavor::Automatic => automatic_module(options, &esm.statements, content, &mut ctx),
        JsxFlavor::Classic => classic_module(&esm.statements, content, &mut ctx),
    };
    output.push('\n');
    output.push_str(&glue);

    for plugin in &options.plugins {
        tracing::debug!(plugin = plugin.name(), "Running MDX JSX plugin");
        plugin
            .transform_jsx(&mut output)
            .map_err(|e| MdxError::plugin_error(plugin.name(), &e).in_file(file))?;
    }

    Ok(output)
}

fn automatic_module(
    options: &MdxCompileOptions,
    statements: &[String],
    content: Vec<JsValue>,
    ctx: &mut CodegenContext,
) -> String {
    let body = match content.len() {
        0 => "null".to_string(),
        1 => content[0].to_js(),
        _ => render_element(ctx, Tag::Jsx(None), vec![], content).to_js(),
    };

    let mut out = String::from("/*@jsxRuntime automatic @jsxImportSource react*/\n");
    let fragment = if ctx.uses_fragment { "Fragment as _Fragment, " } else { "" };
    out.push_str(&format!(
        "import {{{}jsx as _jsx, jsxs as _jsxs}} from \"{}\";\n",
        fragment, options.jsx_runtime
    ));

    let provided = match &options.provider_import_source {
        Some(source) => {
            out.push_str(&format!(
                "import {{useMDXComponents as _provideComponents}} from \"{}\";\n",
                source
            ));
            "_provideComponents(), "
        }
        None => "",
    };

    for statement in statements {
        out.push_str(statement);
        out.push('\n');
    }

    let defaults: Vec<String> = DEFAULT_COMPONENTS
        .iter()
        .map(|tag| format!("{}: \"{}\"", tag, tag))
        .collect();

    out.push_str(&format!(
        "\nfunction _createMdxContent(props) {{\n  const _components = Object.assign({{{}}}, {}props.components);\n  return {};\n}}\n",
        defaults.join(", "),
        provided,
        body
    ));
    out.push_str(&format!(
        "function MDXContent(props = {{}}) {{\n  const {{wrapper: MDXLayout}} = Object.assign({{}}, {}props.components);\n  return MDXLayout ? _jsx(MDXLayout, Object.assign({{}}, props, {{children: _jsx(_createMdxContent, props)}})) : _createMdxContent(props);\n}}\n",
        provided
    ));

    out
}

fn classic_module(statements: &[String], content: Vec<JsValue>, ctx: &mut CodegenContext) -> String {
    let mut out = String::from("/* @jsxRuntime classic */\n/* @jsx mdx */\n");
    out.push_str(&format!("import {{ mdx }} from \"{}\";\n", LEGACY_PRAGMA_SOURCE));
    if ctx.uses_fragment {
        out.push_str("import { Fragment as _Fragment } from \"react\";\n");
    }
    for statement in statements {
        out.push_str(statement);
        out.push('\n');
    }
    out.push('\n');

    if !ctx.shortcodes.is_empty() {
        out.push_str(
            "const makeShortcode = name => function MDXDefaultShortcode(props) {\n  console.warn(\"Component \" + name + \" was not imported, exported, or provided by MDXProvider as global scope\");\n  return mdx(\"div\", props);\n};\n",
        );
        for name in &ctx.shortcodes {
            out.push_str(&format!("const {} = makeShortcode(\"{}\");\n", name, name));
        }
    }

    let mut args = vec![
        "MDXLayout".to_string(),
        "Object.assign({}, layoutProps, props, {components: components, mdxType: \"MDXLayout\"})".to_string(),
    ];
    args.extend(content.iter().map(JsValue::to_js));

    out.push_str("const layoutProps = {};\n");
    out.push_str("const MDXLayout = \"wrapper\";\n");
    out.push_str(&format!(
        "function MDXContent({{ components, ...props }}) {{\n  return mdx({});\n}}\n",
        args.join(", ")
    ));
    out.push_str("MDXContent.isMDXComponent = true;\n");

    out
}
