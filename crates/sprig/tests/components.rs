use std::fs;

use minijinja::context;
use sprig::{
    AttributeBag, Component, ContextData, Context, DirectoryLoader, Engine, Error, Renderer,
    Settings, Slots, Value,
};
use tempfile::TempDir;

/// Collapses whitespace and drops it around tags so markup can be compared
/// regardless of indentation.
fn squash(html: &str) -> String {
    html.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("> ", ">")
        .replace(" <", "<")
        .replace(" >", ">")
}

fn assert_html_eq(actual: &str, expected: &str) {
    assert_eq!(squash(actual), squash(expected), "raw output: {:?}", actual);
}

/// Registers `name` as a function component rendering `source`.
fn with_template(engine: &mut Engine, name: &str, source: &'static str) {
    engine
        .register_fn(name, move |ctx: &mut Context<'_>| ctx.render_str(source))
        .unwrap();
}

#[test]
fn test_inline_component() {
    let mut engine = Engine::new();
    with_template(&mut engine, "hello", "<div {{ attributes }}>Hello, world!</div>");

    let html = engine.render_str(r#"{% #hello id="greeting" %}"#, &()).unwrap();
    assert_eq!(html, r#"<div id="greeting">Hello, world!</div>"#);
}

#[test]
fn test_component_names_with_colon_and_dot() {
    let mut engine = Engine::new();
    with_template(&mut engine, "ui:button", "<button>{% render_slot slots.inner_block %}</button>");
    with_template(&mut engine, "ui.icon", "<i {{ attributes }}></i>");

    let html = engine
        .render_str(r#"{% ui:button %}Save{% endui:button %}{% #ui.icon name="check" %}"#, &())
        .unwrap();
    assert_eq!(html, r#"<button>Save</button><i name="check"></i>"#);
}

#[test]
fn test_attributes_from_context_and_flags() {
    let mut engine = Engine::new();
    with_template(&mut engine, "hello", "<input {{ attributes }}>");

    let html = engine
        .render_str(
            r#"{% #hello type="text" name=field.name value=field.value|upper required disabled=off %}"#,
            &context! { field => context! { name => "email", value => "a&b" }, off => false },
        )
        .unwrap();
    assert_eq!(
        html,
        r#"<input type="text" name="email" value="A&amp;B" required>"#
    );
}

#[test]
fn test_class_values_are_normalized() {
    let mut engine = Engine::new();
    with_template(&mut engine, "hello", "<p {{ attributes }}></p>");

    let html = engine
        .render_str(
            "{% #hello class=classes %}",
            &context! { classes => vec![Value::from("btn"), Value::from("  primary ")] },
        )
        .unwrap();
    assert_eq!(html, r#"<p class="btn primary"></p>"#);
}

#[test]
fn test_default_and_named_slots() {
    let mut engine = Engine::new();
    with_template(
        &mut engine,
        "card",
        r#"<div class="card">
            <h2>{% render_slot slots.title %}</h2>
            <div>{% render_slot slots.inner_block %}</div>
        </div>"#,
    );

    let html = engine
        .render_str(
            r#"{% card %}
                {% slot title %}Fruits{% endslot %}
                Apples are {{ adjective }}.
            {% endcard %}"#,
            &context! { adjective => "tasty" },
        )
        .unwrap();
    assert_html_eq(
        &html,
        r#"<div class="card"><h2>Fruits</h2><div>Apples are tasty.</div></div>"#,
    );
}

#[test]
fn test_duplicate_slots_render_in_order() {
    let mut engine = Engine::new();
    with_template(
        &mut engine,
        "list",
        "<ul>{% for item in slots.item %}<li>{% render_slot item %}</li>{% endfor %}</ul>",
    );

    let html = engine
        .render_str(
            r#"{% list %}
                {% slot item %}First{% endslot %}
                {% slot item %}Second{% endslot %}
                {% slot item %}Third{% endslot %}
            {% endlist %}"#,
            &(),
        )
        .unwrap();
    assert_eq!(html, "<ul><li>First</li><li>Second</li><li>Third</li></ul>");
}

#[test]
fn test_render_slot_on_collection_renders_every_instance() {
    let mut engine = Engine::new();
    with_template(&mut engine, "row", "[{% render_slot slots.cell %}]");

    let html = engine
        .render_str(
            "{% row %}{% slot cell %}a{% endslot %}{% slot cell %}b{% endslot %}{% endrow %}",
            &(),
        )
        .unwrap();
    assert_eq!(html, "[ab]");
}

#[test]
fn test_slots_with_attributes() {
    let mut engine = Engine::new();
    with_template(
        &mut engine,
        "hello",
        r#"<div {{ attributes }} foo="bar">
            <h1 {{ slots.title.attributes }}>{% render_slot slots.title %}</h1>
            <div {{ slots.body.attributes }}>{% render_slot slots.body %}</div>
        </div>"#,
    );

    let html = engine
        .render_str(
            r#"{% hello id="123" %}
                {% slot title class="title" %}Title{% endslot %}
                {% slot body class="foo" x-on:click='bar' @click="baz" foo:bar.baz="foo" required %}
                    Body
                {% endslot %}
            {% endhello %}"#,
            &(),
        )
        .unwrap();
    assert_html_eq(
        &html,
        r#"<div id="123" foo="bar">
            <h1 class="title">Title</h1>
            <div class="foo" x-on:click="bar" @click="baz" foo:bar.baz="foo" required>Body</div>
        </div>"#,
    );
}

fn table_engine() -> Engine {
    let mut engine = Engine::new();
    with_template(
        &mut engine,
        "table",
        r#"<table>
            <tr>{% for col in slots.column %}<th>{{ col.attributes.label }}</th>{% endfor %}</tr>
            {% for row in rows %}
                <tr>{% for col in slots.column %}<td>{% render_slot col row %}</td>{% endfor %}</tr>
            {% endfor %}
        </table>"#,
    );
    engine
}

const TABLE_OUTPUT: &str = r#"<table>
    <tr><th>Name</th><th>Age</th></tr>
    <tr><td>John</td><td>31</td></tr>
    <tr><td>Bob</td><td>51</td></tr>
</table>"#;

fn table_rows() -> Value {
    context! {
        rows => vec![
            context! { name => "John", age => 31 },
            context! { name => "Bob", age => 51 },
        ],
    }
}

#[test]
fn test_scoped_slots_with_let() {
    let html = table_engine()
        .render_str(
            r#"{% table %}
                {% slot column :let="user" label="Name" %}{{ user.name }}{% endslot %}
                {% slot column :let="user" label="Age" %}{{ user.age }}{% endslot %}
            {% endtable %}"#,
            &table_rows(),
        )
        .unwrap();
    assert_html_eq(&html, TABLE_OUTPUT);
}

#[test]
fn test_slot_body_sees_component_loop_variable() {
    let html = table_engine()
        .render_str(
            r#"{% table %}
                {% slot column label="Name" %}{{ row.name }}{% endslot %}
                {% slot column label="Age" %}{{ row.age }}{% endslot %}
            {% endtable %}"#,
            &table_rows(),
        )
        .unwrap();
    assert_html_eq(&html, TABLE_OUTPUT);
}

#[test]
fn test_scoped_binding_does_not_leak() {
    let mut engine = Engine::new();
    with_template(
        &mut engine,
        "each",
        "{% for x in items %}{% render_slot slots.inner_block x %}{% endfor %}|{{ fruit }}",
    );

    let html = engine
        .render_str(
            r#"{% each :let="fruit" %}<{{ fruit }}>{% endeach %}|{{ fruit }}"#,
            &context! { items => vec!["apple", "pear"] },
        )
        .unwrap();
    assert_eq!(html, "<apple><pear>||");
}

#[test]
fn test_scoped_slot_without_value_is_error() {
    let mut engine = Engine::new();
    with_template(&mut engine, "each", "{% render_slot slots.inner_block %}");

    let err = engine
        .render_str(r#"{% each :let="fruit" %}{{ fruit }}{% endeach %}"#, &())
        .unwrap_err();
    assert!(matches!(err, Error::Render(_)));
}

#[test]
fn test_scoped_binding_is_invisible_to_sibling_slots() {
    let mut engine = Engine::new();
    with_template(
        &mut engine,
        "pair",
        "[{% render_slot slots.first value %}][{% render_slot slots.second %}]",
    );

    let html = engine
        .render_str(
            r#"{% pair %}
                {% slot first :let="fruit" %}{{ fruit }}{% endslot %}
                {% slot second %}{{ fruit }}{% endslot %}
            {% endpair %}"#,
            &context! { value => "apple" },
        )
        .unwrap();
    assert_eq!(html, "[apple][]");
}

#[test]
fn test_component_forwards_its_slot_to_a_child() {
    let mut engine = Engine::new();
    with_template(&mut engine, "inner", "<i>{% render_slot slots.inner_block %}</i>");
    with_template(
        &mut engine,
        "outer",
        "<o>{% inner %}{% render_slot slots.inner_block %}{% endinner %}</o>",
    );

    let html = engine
        .render_str("{% outer %}Hi {{ name }}{% endouter %}", &context! { name => "Ann" })
        .unwrap();
    assert_eq!(html, "<o><i>Hi Ann</i></o>");
}

#[test]
fn test_forwarded_named_slot_keeps_its_attributes() {
    let mut engine = Engine::new();
    with_template(&mut engine, "panel", "<section>{% render_slot slots.inner_block %}</section>");
    with_template(
        &mut engine,
        "card",
        "{% panel %}<h2>{% render_slot slots.title %}</h2>{% endpanel %}",
    );

    let html = engine
        .render_str(
            r#"{% card %}{% slot title class="c" %}<b {{ attributes }}>Fruits</b>{% endslot %}{% endcard %}"#,
            &(),
        )
        .unwrap();
    assert_eq!(html, r#"<section><h2><b class="c">Fruits</b></h2></section>"#);
}

fn unordered_list(ctx: &mut Context<'_>) -> sprig::Result<String> {
    let entries = ctx.take_attribute("entries")?.unwrap_or_else(|| Value::from(Vec::<Value>::new()));
    ctx.set("entries", entries);
    ctx.render_str(
        "<ul {{ attributes }}>{% for entry in entries %}<li>{% render_slot slots.inner_block entry %}</li>{% endfor %}</ul>",
    )
}

#[test]
fn test_scoped_default_slot() {
    let mut engine = Engine::new();
    engine.register_fn("unordered_list", unordered_list).unwrap();
    let data = context! { entries => vec!["apples", "bananas", "cherries"] };

    let expected = "<ul class=\"fruits\"><li>I like apples!</li><li>I like bananas!</li><li>I like cherries!</li></ul>";

    let direct = engine
        .render_str(
            r#"{% unordered_list entries=entries class="fruits" %}I like {{ entry }}!{% endunordered_list %}"#,
            &data,
        )
        .unwrap();
    assert_eq!(direct, expected);

    let bound = engine
        .render_str(
            r#"{% unordered_list :let="fruit" entries=entries class="fruits" %}I like {{ fruit }}!{% endunordered_list %}"#,
            &data,
        )
        .unwrap();
    assert_eq!(bound, expected);
}

#[test]
fn test_nested_components() {
    let mut engine = Engine::new();
    with_template(
        &mut engine,
        "hello",
        "<div {{ attributes }}>{% render_slot slots.inner_block %}</div>",
    );

    let html = engine
        .render_str(
            r#"{% hello class="foo" %}
                {% hello class="bar" %}Hello, world!{% endhello %}
            {% endhello %}"#,
            &(),
        )
        .unwrap();
    assert_html_eq(&html, r#"<div class="foo"><div class="bar">Hello, world!</div></div>"#);
}

#[test]
fn test_nested_components_with_slots() {
    let mut engine = Engine::new();
    with_template(
        &mut engine,
        "hello",
        r#"<div {{ attributes }}><div {{ slots.body.attributes }}>{% render_slot slots.body %}</div></div>"#,
    );

    let html = engine
        .render_str(
            r#"{% hello class="hello1" %}
                {% slot body class="foo" %}
                    {% hello class="hello2" %}
                        {% slot body class="bar" %}Hello, world!{% endslot %}
                    {% endhello %}
                {% endslot %}
            {% endhello %}"#,
            &(),
        )
        .unwrap();
    assert_html_eq(
        &html,
        r#"<div class="hello1"><div class="foo">
            <div class="hello2"><div class="bar">Hello, world!</div></div>
        </div></div>"#,
    );
}

#[test]
fn test_component_using_other_components() {
    let mut engine = Engine::new();
    with_template(&mut engine, "header", "<h1>{% render_slot slots.inner_block %}</h1>");
    engine
        .register_fn("hello", |ctx: &mut Context<'_>| {
            let title = ctx.take_attribute("title")?.unwrap_or_else(|| Value::from(""));
            ctx.set("title", title);
            ctx.render_str(
                "<div>{% header %}{{ title }}{% endheader %}<div>{% render_slot slots.inner_block %}</div></div>",
            )
        })
        .unwrap();

    let html = engine
        .render_str(r#"{% hello title="Some title" %}Hello, world!{% endhello %}"#, &())
        .unwrap();
    assert_eq!(html, "<div><h1>Some title</h1><div>Hello, world!</div></div>");
}

#[test]
fn test_merge_attrs_in_component() {
    let mut engine = Engine::new();
    with_template(
        &mut engine,
        "button",
        r#"<button {% merge_attrs attributes class="btn" type="button" data-x+="base" %}>{% render_slot slots.inner_block %}</button>"#,
    );

    let html = engine
        .render_str(
            r#"{% button class="primary" type="submit" data-x="extra" %}Go{% endbutton %}"#,
            &(),
        )
        .unwrap();
    assert_eq!(
        html,
        r#"<button class="btn primary" type="submit" data-x="extra base">Go</button>"#
    );
}

#[test]
fn test_default_slot_name_from_settings() {
    let settings = Settings::from_yaml("default_slot_name: content").unwrap();
    let mut engine = Engine::builder().settings(settings).build().unwrap();
    with_template(&mut engine, "hello", "<div>{% render_slot slots.content %}</div>");

    let html = engine
        .render_str("{% hello %}Hello, world!{% endhello %}", &())
        .unwrap();
    assert_eq!(html, "<div>Hello, world!</div>");
}

#[test]
fn test_prefixed_formatter_from_settings() {
    let settings = Settings::from_json(r#"{"tag_formatter": {"prefix": "x-"}}"#).unwrap();
    let mut engine = Engine::builder().settings(settings).build().unwrap();
    with_template(&mut engine, "hello", "<b>{% render_slot slots.inner_block %}</b>");

    let html = engine
        .render_str("{% x-hello %}hi{% x-endhello %}{% x-hello/ %}", &())
        .unwrap();
    assert_eq!(html, "<b>hi</b><b></b>");
}

struct UnorderedList;

impl Component for UnorderedList {
    fn template(&self) -> Option<&str> {
        Some(
            "<ul {{ attributes }}>{% for entry in entries %}<li>{% render_slot slots.inner_block entry %}</li>{% endfor %}</ul>",
        )
    }

    fn get_context_data(&self, attributes: &mut AttributeBag, _slots: &Slots) -> sprig::Result<ContextData> {
        let entries = attributes
            .remove("entries")
            .unwrap_or_else(|| Value::from(Vec::<Value>::new()));
        Ok(ContextData::from([("entries".to_string(), entries)]))
    }
}

#[test]
fn test_class_component() {
    let mut engine = Engine::new();
    engine.register_component("unordered_list", UnorderedList).unwrap();

    let template = r#"{% unordered_list :let="fruit" entries=entries id="list" %}I like {{ fruit }}!{% endunordered_list %}"#;
    let data = context! { entries => vec!["apples", "bananas"] };

    let html = engine.render_str(template, &data).unwrap();
    assert_eq!(
        html,
        r#"<ul id="list"><li>I like apples!</li><li>I like bananas!</li></ul>"#
    );
    // The inline template is compiled once and reused.
    assert_eq!(engine.render_str(template, &data).unwrap(), html);
}

#[test]
fn test_register_without_name_uses_type_name() {
    let mut engine = Engine::new();
    let name = engine
        .register(None, Renderer::component(UnorderedList))
        .unwrap();
    assert_eq!(name, "UnorderedList");
    assert!(engine.registry().contains("UnorderedList"));

    assert!(engine
        .register(None, Renderer::function(|_: &mut Context<'_>| Ok(String::new())))
        .is_err());
}

#[test]
fn test_unregistered_component_fails_whole_render() {
    let mut engine = Engine::new();
    with_template(&mut engine, "hello", "hi");
    let template = engine.compile("before {% #hello %} after").unwrap();

    engine.unregister("hello").unwrap();
    let mut ctx = engine.new_context();
    let err = template.render(&mut ctx).unwrap_err();
    assert!(matches!(err, Error::ComponentNotRegistered(ref name) if name == "hello"));

    // Its tags are gone too.
    assert!(matches!(
        engine.compile("{% #hello %}").unwrap_err(),
        Error::TagSyntax { .. }
    ));
}

#[test]
fn test_builtin_tag_names_cannot_be_taken() {
    let mut engine = Engine::new();
    let err = engine
        .register_fn("for", |_: &mut Context<'_>| Ok(String::new()))
        .unwrap_err();
    assert!(matches!(err, Error::TagNameCollision { .. }));
    assert!(!engine.registry().contains("for"));
}

#[test]
fn test_recursive_component_hits_limit() {
    let mut engine = Engine::new();
    with_template(&mut engine, "loop", "{% #loop %}");

    let err = engine.render_str("{% #loop %}", &()).unwrap_err();
    assert!(matches!(err, Error::RecursionLimit(_)));
}

#[test]
fn test_cached_render_reuses_compiled_template() {
    let mut engine = Engine::new();
    with_template(&mut engine, "hello", "<p>{{ name }}</p>");

    let first = engine
        .render_cached(Some("page"), "{% #hello %}", &context! { name => "Ann" })
        .unwrap();
    // Same key, different source: the cached template wins.
    let second = engine
        .render_cached(Some("page"), "ignored", &context! { name => "Bo" })
        .unwrap();
    assert_eq!(first, "<p>Ann</p>");
    assert_eq!(second, "<p>Bo</p>");

    engine.clear_cache();
    let third = engine
        .render_cached(Some("page"), "fresh", &context! { name => "Bo" })
        .unwrap();
    assert_eq!(third, "fresh");
}

struct Card;

impl Component for Card {
    fn template_name(&self) -> Option<&str> {
        Some("components/card")
    }
}

#[test]
fn test_component_template_from_directory() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("components")).unwrap();
    fs::write(
        dir.path().join("components/card.html"),
        "<section {{ attributes }}>{% render_slot slots.inner_block %}</section>",
    )
    .unwrap();
    fs::write(dir.path().join("page.html"), "{% card class=\"wide\" %}{{ body }}{% endcard %}").unwrap();

    let mut engine = Engine::builder()
        .loader(DirectoryLoader::new(dir.path()).unwrap())
        .build()
        .unwrap();
    engine.register_component("card", Card).unwrap();

    let html = engine
        .render_template("page", &context! { body => "Hello" })
        .unwrap();
    assert_eq!(html, r#"<section class="wide">Hello</section>"#);
}

#[test]
fn test_missing_template_is_reported() {
    let mut engine = Engine::new();
    engine.register_component("card", Card).unwrap();

    let err = engine.render_str("{% #card %}", &()).unwrap_err();
    assert!(matches!(err, Error::TemplateNotFound(ref name) if name == "components/card"));
}
