//! Request translation.
//!
//! # Responsibilities
//! - Validate descriptors (string URL or options with a string `url`)
//! - Apply option defaults and normalize the method
//! - Expand content-type shorthands and pick the body encoding
//!
//! Translation is pure: the same descriptor always yields the same call.

use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::error::ValidationError;
use crate::request::call::{CallBody, Credentials, HttpCall};
use crate::request::descriptor::RequestDescriptor;
use crate::request::options::RequestOptions;

pub const FORM_MIME: &str = "application/x-www-form-urlencoded";

/// Turn a descriptor into an executable call.
pub fn translate(descriptor: &RequestDescriptor) -> Result<HttpCall, ValidationError> {
    match descriptor {
        RequestDescriptor::Url(url) => Ok(HttpCall::new(Method::GET, parse_url(url)?)),
        RequestDescriptor::Options(opts) => translate_options(opts),
        RequestDescriptor::Malformed(value) => translate_malformed(value),
    }
}

fn translate_malformed(value: &Value) -> Result<HttpCall, ValidationError> {
    let Value::Object(map) = value else {
        return Err(ValidationError::UnsupportedDescriptor);
    };
    if !map.get("url").is_some_and(Value::is_string) {
        return Err(ValidationError::MissingUrl);
    }
    match serde_json::from_value::<RequestOptions>(value.clone()) {
        Ok(opts) => translate_options(&opts),
        Err(e) => Err(ValidationError::InvalidOptions(e.to_string())),
    }
}

/// Map every option onto the call.
pub fn translate_options(opts: &RequestOptions) -> Result<HttpCall, ValidationError> {
    let method = normalize_method(&opts.method)?;
    let mut call = HttpCall::new(method, parse_url(&opts.url)?);

    if supports_redirects(&call.method) {
        call.redirects = Some(opts.redirects);
    }

    call.content_type = Some(expand_mime(&opts.content_type));
    call.accept = opts.accept.as_deref().map(expand_mime);
    call.with_credentials = opts.with_credentials;

    if let Some(query) = &opts.query {
        for (key, value) in query {
            push_query(&mut call.query, key, value);
        }
    }

    if let (Some(user), Some(password)) = (&opts.user, &opts.password) {
        call.auth = Some(Credentials {
            user: user.clone(),
            password: password.clone(),
        });
    }

    call.headers = opts
        .headers
        .iter()
        .filter_map(|(k, v)| stringify(v).map(|v| (k.clone(), v)))
        .collect();

    let fields: Vec<(String, String)> = opts
        .field
        .iter()
        .flatten()
        .filter_map(|(k, v)| stringify(v).map(|v| (k.clone(), v)))
        .collect();
    let attachments = opts.attach.clone().unwrap_or_default();

    if !fields.is_empty() || !attachments.is_empty() {
        if opts.send.is_some() {
            tracing::warn!(url = %opts.url, "`send` payload ignored for multipart request");
        }
        // The transport sets the multipart boundary header itself.
        call.content_type = None;
        call.body = Some(CallBody::Multipart { fields, attachments });
    } else if let Some(send) = opts.send.as_ref().filter(|v| !v.is_null()) {
        call.body = Some(encode_body(send, call.content_type.as_deref()));
    }

    Ok(call)
}

/// Case-normalize a method name. `delete` and its legacy alias `del` map to
/// `DELETE`; other valid tokens pass through uppercased.
pub fn normalize_method(method: &str) -> Result<Method, ValidationError> {
    let upper = match method.to_ascii_lowercase().as_str() {
        "delete" | "del" => "DELETE".to_string(),
        other => other.to_ascii_uppercase(),
    };
    Method::from_bytes(upper.as_bytes()).map_err(|_| ValidationError::InvalidMethod(method.to_string()))
}

/// Whether a redirect limit is meaningful for this method.
pub fn supports_redirects(method: &Method) -> bool {
    [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::PATCH,
        Method::HEAD,
        Method::OPTIONS,
    ]
    .contains(method)
}

/// Expand a content-type shorthand; full MIME types pass through.
pub fn expand_mime(shorthand: &str) -> String {
    let expanded = match shorthand.to_ascii_lowercase().as_str() {
        "json" => "application/json",
        "form" | "urlencoded" | "form-data" => FORM_MIME,
        "html" => "text/html",
        "xml" => "text/xml",
        "text" => "text/plain",
        _ => return shorthand.to_string(),
    };
    expanded.to_string()
}

fn parse_url(raw: &str) -> Result<Url, ValidationError> {
    Url::parse(raw).map_err(|e| ValidationError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

fn encode_body(send: &Value, content_type: Option<&str>) -> CallBody {
    match send {
        Value::String(text) => CallBody::Text(text.clone()),
        Value::Object(map) if content_type == Some(FORM_MIME) => CallBody::Form(
            map.iter()
                .filter_map(|(k, v)| stringify(v).map(|v| (k.clone(), v)))
                .collect(),
        ),
        other => CallBody::Json(other.clone()),
    }
}

fn push_query(pairs: &mut Vec<(String, String)>, key: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                if let Some(item) = stringify(item) {
                    pairs.push((key.to_string(), item));
                }
            }
        }
        other => {
            if let Some(value) = stringify(other) {
                pairs.push((key.to_string(), value));
            }
        }
    }
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        nested => Some(nested.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::options::Attachment;
    use serde_json::json;

    #[test]
    fn test_bare_url_is_plain_get() {
        let call = translate(&"http://host/hello".into()).unwrap();
        assert_eq!(call.method, Method::GET);
        assert_eq!(call.url.as_str(), "http://host/hello");
        assert_eq!(call.content_type, None);
        assert_eq!(call.redirects, None);
        assert_eq!(call.body, None);
    }

    #[test]
    fn test_post_with_json_payload() {
        let opts = RequestOptions::new("http://host/pet")
            .method("POST")
            .send(json!({"name": "Woof", "species": "Dog"}));
        let call = translate(&opts.into()).unwrap();
        assert_eq!(call.method, Method::POST);
        assert_eq!(call.content_type.as_deref(), Some("application/json"));
        assert_eq!(call.redirects, Some(5));
        assert_eq!(
            call.body,
            Some(CallBody::Json(json!({"name": "Woof", "species": "Dog"})))
        );
    }

    #[test]
    fn test_delete_aliases() {
        assert_eq!(normalize_method("DELETE").unwrap(), Method::DELETE);
        assert_eq!(normalize_method("delete").unwrap(), Method::DELETE);
        assert_eq!(normalize_method("del").unwrap(), Method::DELETE);
        assert_eq!(normalize_method("Patch").unwrap(), Method::PATCH);
    }

    #[test]
    fn test_extension_method_has_no_redirects() {
        let call = translate(&RequestOptions::new("http://host/dav").method("propfind").into()).unwrap();
        assert_eq!(call.method.as_str(), "PROPFIND");
        assert_eq!(call.redirects, None);
    }

    #[test]
    fn test_invalid_method() {
        let err = translate(&RequestOptions::new("http://host/").method("no good").into()).unwrap_err();
        assert_eq!(err, ValidationError::InvalidMethod("no good".into()));
    }

    #[test]
    fn test_malformed_descriptors() {
        assert_eq!(
            translate(&json!(123).into()).unwrap_err(),
            ValidationError::UnsupportedDescriptor
        );
        assert_eq!(
            translate(&json!({"method": "post"}).into()).unwrap_err(),
            ValidationError::MissingUrl
        );
        assert_eq!(
            translate(&json!({"url": 42}).into()).unwrap_err(),
            ValidationError::MissingUrl
        );
        assert!(matches!(
            translate(&json!({"url": "http://host/", "redirects": "many"}).into()).unwrap_err(),
            ValidationError::InvalidOptions(_)
        ));
    }

    #[test]
    fn test_scalar_headers_and_fields_are_stringified() {
        let descriptor = RequestDescriptor::from(json!({
            "url": "http://host/upload",
            "method": "post",
            "headers": {"X-Retry": 3, "X-Debug": true, "X-Skip": null},
            "field": {"count": 2, "title": "report"}
        }));
        assert!(descriptor.options().is_some());

        let call = translate(&descriptor).unwrap();
        assert_eq!(
            call.headers,
            vec![
                ("X-Debug".to_string(), "true".to_string()),
                ("X-Retry".to_string(), "3".to_string()),
            ]
        );
        match call.body {
            Some(CallBody::Multipart { fields, .. }) => assert_eq!(
                fields,
                vec![
                    ("count".to_string(), "2".to_string()),
                    ("title".to_string(), "report".to_string()),
                ]
            ),
            other => panic!("expected multipart body, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_url() {
        let err = translate(&"not a url".into()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidUrl { .. }));
    }

    #[test]
    fn test_query_stringification() {
        let opts = RequestOptions::new("http://host/querystring")
            .query("foo", 102030)
            .query("bar", "Pub")
            .query("tags", json!(["a", "b"]))
            .query("skip", Value::Null);
        let call = translate(&opts.into()).unwrap();
        assert_eq!(
            call.query,
            vec![
                ("bar".to_string(), "Pub".to_string()),
                ("foo".to_string(), "102030".to_string()),
                ("tags".to_string(), "a".to_string()),
                ("tags".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_form_and_text_bodies() {
        let form = RequestOptions::new("http://host/f")
            .method("post")
            .content_type("form")
            .send(json!({"a": 1, "b": "x"}));
        let call = translate(&form.into()).unwrap();
        assert_eq!(call.content_type.as_deref(), Some(FORM_MIME));
        assert_eq!(
            call.body,
            Some(CallBody::Form(vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "x".to_string()),
            ]))
        );

        let text = RequestOptions::new("http://host/t")
            .method("post")
            .content_type("text/csv")
            .send("a,b");
        let call = translate(&text.into()).unwrap();
        assert_eq!(call.content_type.as_deref(), Some("text/csv"));
        assert_eq!(call.body, Some(CallBody::Text("a,b".into())));
    }

    #[test]
    fn test_multipart_keeps_attachment_order() {
        let opts = RequestOptions::new("http://host/upload")
            .method("post")
            .field("title", "report")
            .attach(Attachment::new("first", "/tmp/a.txt"))
            .attach(Attachment::new("second", "/tmp/b.txt").filename("b.txt"));
        let call = translate(&opts.into()).unwrap();
        assert!(call.is_multipart());
        assert_eq!(call.content_type, None);
        match call.body {
            Some(CallBody::Multipart { fields, attachments }) => {
                assert_eq!(fields, vec![("title".to_string(), "report".to_string())]);
                let names: Vec<_> = attachments.iter().map(|a| a.name.as_str()).collect();
                assert_eq!(names, vec!["first", "second"]);
            }
            other => panic!("expected multipart body, got {:?}", other),
        }
    }

    #[test]
    fn test_auth_requires_both_parts() {
        let mut opts = RequestOptions::new("http://host/");
        opts.user = Some("alice".into());
        let call = translate(&opts.clone().into()).unwrap();
        assert!(call.auth.is_none());

        let call = translate(&opts.auth("alice", "secret").into()).unwrap();
        assert_eq!(
            call.auth,
            Some(Credentials {
                user: "alice".into(),
                password: "secret".into()
            })
        );
    }

    #[test]
    fn test_accept_and_headers() {
        let opts = RequestOptions::new("http://host/")
            .accept("json")
            .header("X-B", "2")
            .header("X-A", "1")
            .with_credentials(true);
        let call = translate(&opts.into()).unwrap();
        assert_eq!(call.accept.as_deref(), Some("application/json"));
        assert_eq!(
            call.headers,
            vec![("X-A".to_string(), "1".to_string()), ("X-B".to_string(), "2".to_string())]
        );
        assert!(call.with_credentials);
    }
}
