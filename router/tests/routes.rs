use pathway_router::{
    params_map, FromModel, Model, RouteError, RouteTree, TemplateError, UriError,
};
use serde_json::{json, Value};
use std::{cell::RefCell, rc::Rc};

#[test]
fn sub_route_joins_parent_template() {
    let mut tree = RouteTree::new();
    let root = tree.root();
    let sub = tree
        .new_route(root)
        .path_prefix("/111/")
        .unwrap()
        .name("foo")
        .unwrap()
        .subrouter();
    let bar = tree.new_route(sub).path("/222").unwrap().name("bar").unwrap().id();

    assert_eq!(tree.template(bar).map(|t| t.template()), Some("/111/222"));
    assert_eq!(tree.match_path("/111/222").and_then(|m| m.route), Some(bar));
    assert!(tree.match_path("/111//222").is_none());
    assert!(tree.match_path("/111222").is_none());

    assert_eq!(tree.uri("foo", &()), Ok("/111/".to_string()));
    assert_eq!(tree.uri("bar", &()), Ok("/111/222".to_string()));
}

#[test]
fn defaults_fill_only_missing_params() {
    let mut tree = RouteTree::new();
    let root = tree.root();
    let sub = tree
        .new_route(root)
        .path_prefix("/111/{id}")
        .unwrap()
        .params(params_map! { "name" => "gary", "id" => 12 })
        .subrouter();
    tree.new_route(sub)
        .path("/method/{methodName}")
        .unwrap()
        .params(params_map! { "day" => 12, "methodName" => "foo" });

    let m = tree.match_path("/111/222/method/delete").unwrap();
    assert_eq!(
        m.params,
        params_map! {
            "name" => "gary",
            "id" => "222",
            "methodName" => "delete",
            "day" => "12",
        }
    );
}

#[test]
fn routes_are_tried_in_registration_order() {
    let mut tree = RouteTree::new();
    let root = tree.root();
    let first = tree.new_route(root).path("/users/{id}").unwrap().id();
    let second = tree.new_route(root).path("/users/new").unwrap().id();

    assert_eq!(tree.match_path("/users/new").and_then(|m| m.route), Some(first));
    assert_eq!(tree.routes(root), &[first, second]);
}

#[test]
fn build_only_routes_never_match() {
    let mut tree = RouteTree::new();
    let root = tree.root();
    tree.new_route(root)
        .path("/export/{id}")
        .unwrap()
        .name("export")
        .unwrap()
        .build_only(true);

    assert!(tree.match_path("/export/1").is_none());
    assert_eq!(tree.uri("export", &[("id", 1)]), Ok("/export/1".to_string()));
}

#[test]
fn names_are_unique_across_the_tree() {
    let mut tree = RouteTree::new();
    let root = tree.root();
    let sub = tree
        .new_route(root)
        .path_prefix("/a")
        .unwrap()
        .name("a")
        .unwrap()
        .subrouter();

    let err = tree.new_route(sub).path("/b").unwrap().name("a").err();
    assert_eq!(err, Some(RouteError::DuplicateName("a".into())));

    let b = tree.new_route(sub).path("/c").unwrap().name("b").unwrap().id();
    let route = tree.route_mut(b).unwrap();
    let route = route.name("b").unwrap();
    assert!(matches!(
        route.name("c"),
        Err(RouteError::AlreadyNamed { .. })
    ));
    assert_eq!(tree.get("b"), Some(b));
    assert_eq!(tree.get(b), Some(b));
    assert_eq!(tree.get("c"), None);
}

#[test]
fn unknown_and_unbuildable_routes() {
    let mut tree = RouteTree::new();
    let root = tree.root();
    tree.new_route(root).name("bare").unwrap();
    tree.new_route(root)
        .path("/p/{id:[0-9]+}")
        .unwrap()
        .name("p")
        .unwrap();

    assert_eq!(
        tree.uri("missing", &()),
        Err(RouteError::UnknownRoute("missing".into()))
    );
    assert_eq!(tree.uri("bare", &()), Err(RouteError::NoTemplate));
    assert!(matches!(
        tree.uri("p", &[("id", "x")]),
        Err(RouteError::Uri(UriError::PatternMismatch { .. }))
    ));
}

#[test]
fn invalid_path_is_reported() {
    let mut tree = RouteTree::new();
    let root = tree.root();
    assert_eq!(
        tree.new_route(root).path("nope").err(),
        Some(RouteError::Template(TemplateError::MissingLeadingSlash("nope".into())))
    );
    assert!(matches!(
        tree.new_route(root).path("/a").unwrap().path("b"),
        Err(RouteError::Template(TemplateError::MissingLeadingSlash(_)))
    ));
}

struct User {
    id: u32,
    handle: Option<String>,
}

impl Model for User {
    fn get(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(json!(self.id)),
            "handle" => self.handle.clone().map(Value::String),
            _ => None,
        }
    }
}

#[test]
fn uri_from_model_and_json() {
    let mut tree = RouteTree::new();
    let root = tree.root();
    tree.new_route(root)
        .path("/users/{id:[0-9]+}/{handle}")
        .unwrap()
        .name("user")
        .unwrap();

    let user = User {
        id: 42,
        handle: Some("ada".into()),
    };
    assert_eq!(
        tree.uri("user", &FromModel(&user)),
        Ok("/users/42/ada".to_string())
    );

    let anonymous = User { id: 1, handle: None };
    assert_eq!(
        tree.uri("user", &FromModel(&anonymous)),
        Err(RouteError::Uri(UriError::MissingParam("handle".into())))
    );

    let value = json!({ "id": 7, "handle": "bob" });
    assert_eq!(tree.uri("user", &value), Ok("/users/7/bob".to_string()));
}

#[test]
fn match_subscribers_are_independent_per_route() {
    let mut tree = RouteTree::new();
    let root = tree.root();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let a = tree.new_route(root).path("/a").unwrap().name("a").unwrap().id();
    let sub = {
        let seen = Rc::clone(&seen);
        tree.subscribe("a", move |ev| seen.borrow_mut().push(ev.route))
    }
    .unwrap();

    assert!(tree.subscribe("b", |_| {}).is_none());
    assert!(tree.unsubscribe(a, sub));
    assert!(!tree.unsubscribe(a, sub));
    assert!(seen.borrow().is_empty());
}

#[test]
fn custom_matcher_contributes_params() {
    use pathway_router::{PathMatcher, RouteMatch};

    struct Locale;

    impl PathMatcher for Locale {
        fn matches(&self, path: &str) -> bool {
            path.starts_with("/en/") || path.starts_with("/fr/")
        }

        fn set_match(&self, path: &str, m: &mut RouteMatch) {
            m.params.insert_if_absent("lang", &path[1..3]);
        }
    }

    let mut tree = RouteTree::new();
    let root = tree.root();
    tree.new_route(root)
        .path("/{lang}/docs")
        .unwrap()
        .matcher(Locale);

    let m = tree.match_path("/fr/docs").unwrap();
    assert_eq!(m.params, params_map! { "lang" => "fr" });
    assert!(tree.match_path("/de/docs").is_none());
}
