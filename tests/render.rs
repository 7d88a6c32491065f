//! End-to-end rendering tests against the public API.

use tinta::{Error, Highlighter, Options, RenderFlags, Renderer};

#[test]
fn renders_a_small_document_end_to_end() {
    let input = "# Title\n\nHello *world* and [ref][1]\n\n[1]: http://x.test \"T\"";
    let html = tinta::render_with(input, &Options::default()).unwrap();
    similar_asserts::assert_eq!(
        html,
        "<h1 id=\"title\">Title</h1>\n<p>Hello <em>world</em> and \
         <a href=\"http://x.test\" title=\"T\">ref</a></p>\n"
    );
}

#[test]
fn terminates_on_a_document_using_every_construct() {
    let input = "\
# Top

Intro with **bold**, *em*, `code`, ~~gone~~, and <http://a.test>.

> quoted
>
> - one
> - two

1. first
2. second

| h1 | h2 |
|:---|---:|
| a  | b  |

```text
fenced
```

    indented

---

Tail paragraph with a [link](/x \"t\") and ![img](/i.png).
";
    let html = tinta::render_with(input, &Options::default()).unwrap();
    assert!(html.contains("<h1"));
    assert!(html.contains("<blockquote>"));
    assert!(html.contains("<ol>"));
    assert!(html.contains("<table>"));
    assert!(html.contains("<hr>"));
    assert!(html.contains("<img src=\"/i.png\""));
}

#[test]
fn escapes_specials_without_double_escaping_entities() {
    let html = tinta::render_with("5 < 6 & \"q\" &amp; 'z'", &Options::default()).unwrap();
    similar_asserts::assert_eq!(html, "<p>5 &lt; 6 &amp; &quot;q&quot; &amp; &#39;z&#39;</p>\n");
}

#[test]
fn reference_labels_fold_case_both_ways() {
    let upper_def = tinta::render_with("[x][Foo]\n\n[FOO]: /y", &Options::default()).unwrap();
    let lower_def = tinta::render_with("[x][Foo]\n\n[foo]: /y", &Options::default()).unwrap();
    assert_eq!(upper_def, "<p><a href=\"/y\">x</a></p>\n");
    assert_eq!(upper_def, lower_def);
}

#[test]
fn one_blank_line_promotes_the_whole_list_to_loose() {
    let tight = tinta::render_with("- a\n- b\n- c", &Options::default()).unwrap();
    similar_asserts::assert_eq!(tight, "<ul>\n<li>a</li>\n<li>b</li>\n<li>c</li>\n</ul>\n");

    let loose = tinta::render_with("- a\n\n- b\n- c", &Options::default()).unwrap();
    similar_asserts::assert_eq!(
        loose,
        "<ul>\n<li><p>a</p>\n</li>\n<li><p>b</p>\n</li>\n<li><p>c</p>\n</li>\n</ul>\n"
    );
}

#[test]
fn alignment_row_maps_to_column_styles_in_order() {
    let input = "a|b|c|d\n:--|--:|:-:|---\n1|2|3|4";
    let html = tinta::render_with(input, &Options::default()).unwrap();
    assert!(html.contains("<th style=\"text-align:left\">a</th>"));
    assert!(html.contains("<th style=\"text-align:right\">b</th>"));
    assert!(html.contains("<th style=\"text-align:center\">c</th>"));
    assert!(html.contains("<th>d</th>"));
    assert!(html.contains("<td style=\"text-align:left\">1</td>"));
    assert!(html.contains("<td>4</td>"));
}

#[test]
fn double_emphasis_nests_a_single_em() {
    let html = tinta::render_with("**a*b*c**", &Options::default()).unwrap();
    similar_asserts::assert_eq!(html, "<p><strong>a<em>b</em>c</strong></p>\n");
}

#[test]
fn sanitize_drops_unsafe_link_schemes() {
    let options = Options::builder().sanitize(true).build();
    let html = tinta::render_with("[x](javascript:alert(1))", &options).unwrap();
    similar_asserts::assert_eq!(html, "<p><a href=\"\">x</a>)</p>\n");
}

struct Shout;

impl Highlighter for Shout {
    fn highlight(&self, code: &str, lang: Option<&str>) -> Result<Option<String>, String> {
        match lang {
            Some("shout") => Ok(Some(code.to_uppercase())),
            Some("bad") => Err("no such grammar".to_string()),
            _ => Ok(None),
        }
    }
}

#[test]
fn silent_mode_renders_the_error_instead_of_failing() {
    let failing = Options::builder().highlighter(Shout).build();
    let err = tinta::render_with("```bad\nx\n```", &failing).unwrap_err();
    assert!(matches!(err, Error::Highlight { .. }));

    let silent = Options::builder().highlighter(Shout).silent(true).build();
    let html = tinta::render_with("```bad\nx\n```", &silent).unwrap();
    similar_asserts::assert_eq!(
        html,
        "<p>An error occurred:</p><pre>syntax highlighter failed: no such grammar</pre>"
    );
}

#[test]
fn async_render_delivers_the_result_to_the_callback() {
    let (tx, rx) = std::sync::mpsc::channel();
    tinta::render_async("# Hi".to_string(), Options::default(), move |result| {
        tx.send(result).unwrap();
    });
    let html = rx.recv().unwrap().unwrap();
    assert_eq!(html, "<h1 id=\"hi\">Hi</h1>\n");
}

#[test]
fn async_render_pre_applies_the_highlighter() {
    let options = Options::builder().highlighter(Shout).build();
    let (tx, rx) = std::sync::mpsc::channel();
    tinta::render_async("```shout\nhi\n```".to_string(), options, move |result| {
        tx.send(result).unwrap();
    });
    let html = rx.recv().unwrap().unwrap();
    assert_eq!(html, "<pre><code class=\"lang-shout\">HI\n</code></pre>\n");
}

#[test]
fn async_render_surfaces_highlighter_failures() {
    let options = Options::builder().highlighter(Shout).build();
    let (tx, rx) = std::sync::mpsc::channel();
    tinta::render_async("```bad\nx\n```".to_string(), options, move |result| {
        tx.send(result).unwrap();
    });
    let err = rx.recv().unwrap().unwrap_err();
    match err {
        Error::Highlight { reason } => assert_eq!(reason, "no such grammar"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn async_render_delivers_the_error_fragment_when_silent() {
    let options = Options::builder().highlighter(Shout).silent(true).build();
    let (tx, rx) = std::sync::mpsc::channel();
    tinta::render_async("```bad\nx\n```".to_string(), options, move |result| {
        tx.send(result).unwrap();
    });
    let html = rx.recv().unwrap().unwrap();
    similar_asserts::assert_eq!(
        html,
        "<p>An error occurred:</p><pre>syntax highlighter failed: no such grammar</pre>"
    );
}

struct NewTabLinks;

impl Renderer for NewTabLinks {
    fn link(&self, _flags: &RenderFlags, href: &str, title: Option<&str>, text: &str) -> String {
        let mut out = format!("<a target=\"_blank\" href=\"{href}\"");
        if let Some(title) = title {
            out.push_str(&format!(" title=\"{title}\""));
        }
        out.push('>');
        out.push_str(text);
        out.push_str("</a>");
        out
    }
}

#[test]
fn custom_renderer_overrides_only_the_link_method() {
    let options = Options::builder().renderer(NewTabLinks).build();
    let html = tinta::render_with("*em* [go](/x \"t\")", &options).unwrap();
    similar_asserts::assert_eq!(
        html,
        "<p><em>em</em> <a target=\"_blank\" href=\"/x\" title=\"t\">go</a></p>\n"
    );
}

#[test]
fn xhtml_closes_void_elements() {
    let options = Options::builder().xhtml(true).build();
    let html = tinta::render_with("---\n\na  \nb", &options).unwrap();
    similar_asserts::assert_eq!(html, "<hr/>\n<p>a<br/>b</p>\n");
}
