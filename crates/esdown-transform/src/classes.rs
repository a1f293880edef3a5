//! Class lowering.
//!
//! A class becomes a wrapper function that is called once with the
//! superclass:
//!
//! ```text
//! var A = (function(super$0){"use strict";
//!     var proto$0 = {}, static$0 = {};    // pending members
//!     MIXIN$0(A, super$0);                // inherited statics
//!     function A(x) { ... }               // the constructor
//!     A.prototype = Object.create(...);   // wiring, right after it
//!     proto$0.m = function() { ... };     // methods, in source order
//!     function get$y$0() { ... }          // accessor backing functions
//!     MIXIN$0(A.prototype, proto$0);
//!     MIXIN$0(A, static$0);
//!     proto$0 = void 0; static$0 = void 0;
//!     return A;
//! })(B);
//! ```
//!
//! Members keep their place in the text, so computed keys still evaluate
//! in source order. Named instance accessors are installed by the wiring
//! statement and named static ones right after the first static accessor,
//! both with non-enumerable descriptors. Computed accessors are defined in
//! place on the pending-member holder.

use crate::lower::Lowerer;
use esdown_scope::text;
use esdown_scope::walk::{ClassSite, MemberSite};
use esdown_scope::{HelperInit, LowerResult, ScopeId, TextRange};
use swc_common::Spanned;
use swc_ecma_ast::{
    AssignExpr, AssignTarget, CallExpr, Callee, ClassMember, ClassMethod, Expr, MethodKind,
    PropName, SimpleAssignTarget, SuperProp, SuperPropExpr, UpdateExpr,
};

pub(crate) struct ClassFrame {
    pub name: String,
    /// Wrapper parameter holding the superclass
    pub super_name: Option<String>,
    pub member: Option<MemberSite>,
    /// Scope the class appears in; helpers are requested from here
    pub scope: ScopeId,
}

struct Accessor {
    lookup: String,
    /// Property key as written in a descriptor map
    key: String,
    get: Option<String>,
    set: Option<String>,
}

/// Named accessors of one side of a class, in first-seen order.
#[derive(Default)]
struct Accessors(Vec<Accessor>);

impl Accessors {
    fn add(&mut self, lookup: String, key: String, kind: MethodKind, function: String) {
        let index = match self.0.iter().position(|a| a.lookup == lookup) {
            Some(index) => index,
            None => {
                self.0.push(Accessor {
                    lookup,
                    key,
                    get: None,
                    set: None,
                });
                self.0.len() - 1
            }
        };
        let accessor = &mut self.0[index];
        if kind == MethodKind::Getter {
            accessor.get = Some(function);
        } else {
            accessor.set = Some(function);
        }
    }

    fn descriptors(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|a| {
                let mut fields = Vec::new();
                if let Some(get) = &a.get {
                    fields.push(format!("\"get\": {}", get));
                }
                if let Some(set) = &a.set {
                    fields.push(format!("\"set\": {}", set));
                }
                fields.push("\"configurable\": true".to_string());
                fields.push("\"enumerable\": false".to_string());
                format!("{}: {{{}}}", a.key, fields.join(", "))
            })
            .collect()
    }
}

fn function_keyword(method: &ClassMethod) -> &'static str {
    match (method.function.is_async, method.function.is_generator) {
        (true, true) => "async function*",
        (true, false) => "async function",
        (false, true) => "function*",
        (false, false) => "function",
    }
}

impl Lowerer<'_> {
    pub(crate) fn begin_class(&mut self, site: &ClassSite<'_>) -> LowerResult<()> {
        for member in &site.class.body {
            self.reject_member(member)?;
        }
        let name = match site.ident {
            Some(ident) => self.binding_name(ident),
            None => self.unit.unique("Class", true),
        };
        let super_name = site
            .class
            .super_class
            .as_ref()
            .map(|_| self.unit.unique_by_token("super", "super"));
        log::debug!("lowering class {} at {}", name, site.range.start);
        self.classes.push(ClassFrame {
            name,
            super_name,
            member: None,
            scope: self.current_scope(),
        });
        Ok(())
    }

    fn reject_member(&self, member: &ClassMember) -> LowerResult<()> {
        let what = match member {
            ClassMember::ClassProp(_) | ClassMember::AutoAccessor(_) => "class field",
            ClassMember::PrivateProp(_) | ClassMember::PrivateMethod(_) => "private class member",
            ClassMember::StaticBlock(_) => "static initialization block",
            ClassMember::Method(m) if matches!(m.key, PropName::BigInt(_)) => "bigint method key",
            _ => return Ok(()),
        };
        Err(self.unit.assertion(self.range(member.span()), what))
    }

    pub(crate) fn finish_class(&mut self, site: &ClassSite<'_>) -> LowerResult<()> {
        let frame = self
            .classes
            .pop()
            .ok_or_else(|| self.unit.assertion(site.range, "class left without being entered"))?;
        let class = site.class;
        let name = frame.name.clone();
        let dp = self.define_property_helper(frame.scope)?;

        let mut uses_proto = false;
        let mut uses_static = false;
        let mut has_constructor = false;
        let mut accessors = Accessors::default();
        let mut static_accessors = Accessors::default();
        let mut first_static_accessor = None;
        let mut backing: Vec<Option<String>> = Vec::with_capacity(class.body.len());
        for member in &class.body {
            let mut function = None;
            match member {
                ClassMember::Constructor(_) => has_constructor = true,
                ClassMember::Method(m) => match (m.kind, &m.key) {
                    (MethodKind::Method, _) | (_, PropName::Computed(_)) => {
                        if m.is_static {
                            uses_static = true;
                        } else {
                            uses_proto = true;
                        }
                    }
                    (kind, key) => {
                        let (lookup, quoted) = self.accessor_key(key)?;
                        let prefix = if kind == MethodKind::Getter { "get" } else { "set" };
                        let base = format!("{}${}", prefix, text::sanitize_identifier(&lookup));
                        let backing_name = self.unit.unique(&base, true);
                        let table = if m.is_static {
                            first_static_accessor.get_or_insert(self.range(m.span).end);
                            &mut static_accessors
                        } else {
                            &mut accessors
                        };
                        table.add(lookup, quoted, kind, backing_name.clone());
                        function = Some(backing_name);
                    }
                },
                _ => {}
            }
            backing.push(function);
        }

        let proto = uses_proto.then(|| self.unit.unique_by_token("proto", "proto"));
        let statics = uses_static.then(|| self.unit.unique_by_token("static", "static"));
        let mixin = if uses_proto || uses_static || frame.super_name.is_some() {
            Some(self.mixin_helper(frame.scope, &dp)?)
        } else {
            None
        };
        let wiring = wiring(&frame, &dp, &accessors);
        if let Some(at) = first_static_accessor {
            let statics = static_accessors.descriptors();
            self.unit.edits.insert_after(
                at,
                format!("Object.defineProperties({}, {{{}}});", name, statics.join(", ")),
            );
        }

        for (member, function) in class.body.iter().zip(&backing) {
            match member {
                ClassMember::Constructor(c) => {
                    let key = self.range(c.key.span());
                    self.supersede(key, format!("function {}", name))?;
                    let Some(body) = &c.body else {
                        return Err(self.unit.assertion(self.range(c.span), "constructor without a body"));
                    };
                    let end = self.range(body.span).end;
                    self.unit.edits.insert_after(end, wiring.clone());
                }
                ClassMember::Method(m) => {
                    let holder = if m.is_static { &statics } else { &proto };
                    let holder = holder.as_deref().unwrap_or_default();
                    self.lower_method(m, function.as_deref(), holder, &dp)?;
                }
                _ => {}
            }
        }

        // the wrapper header replaces everything up to the opening brace
        let range = site.range;
        let super_text = match &class.super_class {
            Some(expr) => self.render(self.range(expr.span()))?,
            None => String::new(),
        };
        let from = match (&class.super_class, site.ident) {
            (Some(expr), _) => self.range(expr.span()).end,
            (None, Some(ident)) => self.range(ident.span).end,
            (None, None) => range.start + "class".len() as u32,
        };
        let Some(open) = text::find_token(self.unit.source(), from as usize, range.end as usize, "{") else {
            return Err(self.unit.assertion(range, "class body without `{`"));
        };
        let open = open as u32;

        let mut head = String::new();
        if site.is_decl {
            head.push_str(&format!("var {} = ", name));
        }
        head.push_str(&format!(
            "(function({}){{",
            frame.super_name.as_deref().unwrap_or_default()
        ));
        if !self.unit.tree.scope(frame.scope).strict {
            head.push_str("\"use strict\";");
        }
        let holders: Vec<String> = [&proto, &statics]
            .into_iter()
            .flatten()
            .map(|h| format!("{} = {{}}", h))
            .collect();
        if !holders.is_empty() {
            head.push_str(&format!("var {};", holders.join(", ")));
        }
        if let (Some(mixin), Some(sup)) = (&mixin, &frame.super_name) {
            head.push_str(&format!("{}({}, {});", mixin, name, sup));
        }
        if !has_constructor {
            match &frame.super_name {
                Some(sup) => head.push_str(&format!(
                    "function {}(){{{}.apply(this, arguments)}}",
                    name, sup
                )),
                None => head.push_str(&format!("function {}(){{}}", name)),
            }
            head.push_str(&wiring);
        }
        self.supersede(TextRange::new(range.start, open + 1), head)?;

        let mut tail = String::new();
        if let Some(mixin) = &mixin {
            if let Some(proto) = &proto {
                tail.push_str(&format!("{}({}.prototype, {});", mixin, name, proto));
            }
            if let Some(statics) = &statics {
                tail.push_str(&format!("{}({}, {});", mixin, name, statics));
            }
        }
        for holder in [&proto, &statics].into_iter().flatten() {
            tail.push_str(&format!("{} = void 0;", holder));
        }
        tail.push_str(&format!("return {};}})({})", name, super_text));
        if site.is_decl {
            tail.push(';');
        }
        self.supersede(TextRange::new(range.end - 1, range.end), tail)
    }

    /// Lookup name and descriptor-map key of a non-computed accessor.
    fn accessor_key(&self, key: &PropName) -> LowerResult<(String, String)> {
        let raw = self.unit.slice(self.range(key.span())).to_string();
        match key {
            PropName::Ident(i) => Ok((i.sym.to_string(), format!("\"{}\"", i.sym))),
            PropName::Str(_) => {
                let unquoted = raw.get(1..raw.len().saturating_sub(1)).unwrap_or_default();
                Ok((unquoted.to_string(), raw))
            }
            PropName::Num(_) => Ok((raw.clone(), raw)),
            _ => Err(self.unit.assertion(self.range(key.span()), "accessor key")),
        }
    }

    fn lower_method(
        &mut self,
        method: &ClassMethod,
        backing: Option<&str>,
        holder: &str,
        dp: &str,
    ) -> LowerResult<()> {
        let range = self.range(method.span);
        let head = TextRange::new(range.start, self.range(method.key.span()).end);
        if let Some(function) = backing {
            return self.supersede(head, format!("function {}", function));
        }
        match method.kind {
            MethodKind::Method => {
                let target = self.property_access(holder, &method.key)?;
                self.supersede(head, format!("{} = {}", target, function_keyword(method)))?;
                self.unit.edits.insert_after(range.end, ";");
            }
            kind => {
                let PropName::Computed(computed) = &method.key else {
                    return Err(self.unit.assertion(head, "accessor without a backing function"));
                };
                let key = self.render(self.range(computed.expr.span()))?;
                let slot = if kind == MethodKind::Getter { "get" } else { "set" };
                self.supersede(
                    head,
                    format!("{}({}, {}, {{\"{}\": function", dp, holder, key, slot),
                )?;
                self.unit.edits.insert_after(
                    range.end,
                    ", \"configurable\": true, \"enumerable\": true});",
                );
            }
        }
        Ok(())
    }

    fn define_property_helper(&mut self, scope: ScopeId) -> LowerResult<String> {
        self.unit.bubbled_variable_declaration(
            scope,
            "DP",
            HelperInit::Value("Object.defineProperty".to_string()),
        )
    }

    fn mixin_helper(&mut self, scope: ScopeId, dp: &str) -> LowerResult<String> {
        let body = format!(
            "(t, s){{for(var p in s){{if(Object.prototype.hasOwnProperty.call(s, p)){{{}(t, p, Object.getOwnPropertyDescriptor(s, p));}}}}return t}}",
            dp
        );
        self.unit
            .bubbled_variable_declaration(scope, "MIXIN", HelperInit::Function(body))
    }

    fn super_get_helper(&mut self, scope: ScopeId) -> LowerResult<String> {
        let body = "(o, k, r){var d;while(o && !(d = Object.getOwnPropertyDescriptor(o, k)))o = Object.getPrototypeOf(o);return d ? (d.get ? d.get.call(r) : d.value) : void 0}";
        self.unit.bubbled_variable_declaration(
            scope,
            "SUPER_GET",
            HelperInit::Function(body.to_string()),
        )
    }

    /// The object `super.x` reads from in the current member.
    fn super_base(&self, range: TextRange) -> LowerResult<String> {
        let frame = self
            .classes
            .last()
            .ok_or_else(|| self.unit.assertion(range, "super outside a class"))?;
        let is_static = frame.member.is_some_and(|m| m.is_static);
        Ok(match (&frame.super_name, is_static) {
            (Some(sup), false) => format!("{}.prototype", sup),
            (Some(sup), true) => sup.clone(),
            (None, false) => "Object.prototype".to_string(),
            (None, true) => "Function.prototype".to_string(),
        })
    }

    /// `super(...)` and `super.m(...)` become calls with an explicit
    /// receiver.
    pub(crate) fn lower_super_call(&mut self, call: &CallExpr) -> LowerResult<()> {
        let (callee, target) = match &call.callee {
            Callee::Super(s) => {
                let callee = self.range(s.span);
                let sup = self
                    .classes
                    .last()
                    .and_then(|f| f.super_name.clone())
                    .ok_or_else(|| self.unit.assertion(callee, "super call without a superclass"))?;
                (callee, sup)
            }
            Callee::Expr(expr) => match &**expr {
                Expr::SuperProp(prop) => {
                    let callee = self.range(prop.span);
                    let base = self.super_base(callee)?;
                    let target = match &prop.prop {
                        SuperProp::Ident(i) => format!("{}.{}", base, i.sym),
                        SuperProp::Computed(c) => {
                            format!("{}[{}]", base, self.render(self.range(c.expr.span()))?)
                        }
                    };
                    (callee, target)
                }
                _ => return Ok(()),
            },
            Callee::Import(_) => return Ok(()),
        };

        let range = self.range(call.span);
        if call.args.iter().any(|a| a.spread.is_some()) {
            let mut parts = Vec::with_capacity(call.args.len());
            for arg in &call.args {
                let text = self.render(self.range(arg.expr.span()))?;
                parts.push(match arg.spread {
                    Some(_) => text,
                    None => format!("[{}]", text),
                });
            }
            return self.supersede(
                range,
                format!("{}.apply(this, [].concat({}))", target, parts.join(", ")),
            );
        }

        let Some(open) = text::find_token(self.unit.source(), callee.end as usize, range.end as usize, "(") else {
            return Err(self.unit.assertion(range, "call without an argument list"));
        };
        self.supersede(callee, format!("{}.call", target))?;
        let receiver = if call.args.is_empty() { "this" } else { "this, " };
        self.unit.edits.insert_after(open as u32 + 1, receiver);
        Ok(())
    }

    /// A super property read outside a call.
    pub(crate) fn lower_super_get(&mut self, prop: &SuperPropExpr) -> LowerResult<()> {
        let range = self.range(prop.span);
        let base = self.super_base(range)?;
        let key = match &prop.prop {
            SuperProp::Ident(i) => format!("\"{}\"", i.sym),
            SuperProp::Computed(c) => self.render(self.range(c.expr.span()))?,
        };
        let scope = self
            .classes
            .last()
            .map_or_else(|| self.current_scope(), |f| f.scope);
        let getter = self.super_get_helper(scope)?;
        self.supersede(range, format!("{}({}, {}, this)", getter, base, key))
    }

    pub(crate) fn reject_super_write_assign(&self, assign: &AssignExpr) -> LowerResult<()> {
        match &assign.left {
            AssignTarget::Simple(SimpleAssignTarget::SuperProp(prop)) => Err(self
                .unit
                .assertion(self.range(prop.span), "assignment to a super property")),
            _ => Ok(()),
        }
    }

    pub(crate) fn reject_super_write_update(&self, update: &UpdateExpr) -> LowerResult<()> {
        match &*update.arg {
            Expr::SuperProp(prop) => Err(self
                .unit
                .assertion(self.range(prop.span), "update of a super property")),
            _ => Ok(()),
        }
    }
}

/// The statement that links the prototype, installs named instance
/// accessors and seals the `prototype` slot.
fn wiring(frame: &ClassFrame, dp: &str, accessors: &Accessors) -> String {
    let name = &frame.name;
    let descriptors = accessors.descriptors();
    let mut out = String::new();
    match &frame.super_name {
        Some(sup) => {
            let mut props = vec![format!(
                "\"constructor\": {{\"value\": {}, \"configurable\": true, \"writable\": true}}",
                name
            )];
            props.extend(descriptors);
            out.push_str(&format!(
                "{}.prototype = Object.create({}.prototype, {{{}}});",
                name,
                sup,
                props.join(", ")
            ));
        }
        None if !descriptors.is_empty() => out.push_str(&format!(
            "Object.defineProperties({}.prototype, {{{}}});",
            name,
            descriptors.join(", ")
        )),
        None => {}
    }
    out.push_str(&format!("{}({}, \"prototype\", {{\"writable\": false}});", dp, name));
    out
}

#[cfg(test)]
mod tests {
    use crate::tests::{lower, lower_err};
    use esdown_scope::ErrorKind;

    const DP: &str = "var DP$0 = Object.defineProperty;";

    #[test]
    fn test_empty_class() {
        assert_eq!(
            lower("class A {}"),
            format!(
                "{}var A = (function(){{\"use strict\";function A(){{}}DP$0(A, \"prototype\", {{\"writable\": false}});return A;}})();",
                DP
            )
        );
    }

    #[test]
    fn test_methods_go_through_the_holder() {
        let out = lower("class A { m() { return 1; } }");
        let class = &out[out.find("var A = ").unwrap()..];
        assert_eq!(
            class,
            "var A = (function(){\"use strict\";var proto$0 = {};function A(){}DP$0(A, \"prototype\", {\"writable\": false}); proto$0.m = function() { return 1; }; MIXIN$0(A.prototype, proto$0);proto$0 = void 0;return A;})();"
        );
        assert!(out.starts_with(DP));
        assert!(out.contains("function MIXIN$0(t, s){for(var p in s)"));
    }

    #[test]
    fn test_constructor_accessor_and_static() {
        let out = lower(
            "class A { constructor(x){this.x=x;} get y(){return this.x*2;} static z(){return 1;} }",
        );
        assert!(!out.contains("var proto$0"));
        assert!(out.contains("var static$0 = {};"));
        assert!(out.contains(
            "function A(x){this.x=x;}Object.defineProperties(A.prototype, {\"y\": {\"get\": get$y$0, \"configurable\": true, \"enumerable\": false}});DP$0(A, \"prototype\", {\"writable\": false});"
        ));
        assert!(out.contains("function get$y$0(){return this.x*2;}"));
        assert!(out.contains("static$0.z = function(){return 1;};"));
        assert!(out.ends_with("MIXIN$0(A, static$0);static$0 = void 0;return A;})();"));
    }

    #[test]
    fn test_inheritance() {
        let out = lower(
            "class B extends A { constructor(x){ super(x); } y(){ return super.y + 1; } static s(){ return super.s(); } }",
        );
        assert!(out.contains("var B = (function(super$0){\"use strict\";var proto$0 = {}, static$0 = {};MIXIN$0(B, super$0);"));
        assert!(out.contains(
            "function B(x){ super$0.call(this, x); }B.prototype = Object.create(super$0.prototype, {\"constructor\": {\"value\": B, \"configurable\": true, \"writable\": true}});DP$0(B, \"prototype\", {\"writable\": false});"
        ));
        assert!(out.contains("proto$0.y = function(){ return SUPER_GET$0(super$0.prototype, \"y\", this) + 1; };"));
        assert!(out.contains("static$0.s = function(){ return super$0.s.call(this); };"));
        assert!(out.ends_with("return B;})(A);"));
    }

    #[test]
    fn test_static_accessors_follow_the_first_one() {
        let out = lower("class A { static m(){} static get v(){ return 1; } static set v(x){} }");
        assert!(out.contains(
            "function get$v$0(){ return 1; }Object.defineProperties(A, {\"v\": {\"get\": get$v$0, \"set\": set$v$0, \"configurable\": true, \"enumerable\": false}}); function set$v$0(x){}"
        ));
        assert!(out.contains("function A(){}DP$0(A, \"prototype\", {\"writable\": false});"));
    }

    #[test]
    fn test_default_constructor_forwards_arguments() {
        let out = lower("class B extends A {}");
        assert!(out.contains("function B(){super$0.apply(this, arguments)}B.prototype = Object.create("));
    }

    #[test]
    fn test_spread_super_call() {
        let out = lower("class B extends A { constructor(...a){ super(1, ...a); } }");
        assert!(out.contains(
            "function B(){var a = [].slice.call(arguments, 0); super$0.apply(this, [].concat([1], a)); }"
        ));
    }

    #[test]
    fn test_computed_members() {
        let out = lower("class A { [k]() {} get [g]() { return 1; } }");
        assert!(out.contains("proto$0[k] = function() {};"));
        assert!(out.contains(
            "DP$0(proto$0, g, {\"get\": function() { return 1; }, \"configurable\": true, \"enumerable\": true});"
        ));
    }

    #[test]
    fn test_class_expressions() {
        let out = lower("var X = class Y { m() { return Y; } };");
        assert!(out.contains("var X = (function(){\"use strict\";var proto$0 = {};function Y(){}"));
        assert!(out.contains("proto$0.m = function() { return Y; };"));
        assert!(out.ends_with("return Y;})();"));

        let out = lower("var X = class {};");
        assert!(out.contains("function Class$0(){}"));
        assert!(out.ends_with("return Class$0;})();"));
    }

    #[test]
    fn test_strict_context_skips_directive() {
        let out = lower("'use strict'; class A {}");
        assert!(out.starts_with("'use strict';var DP$0"));
        assert!(out.contains("var A = (function(){function A(){}"));
    }

    #[test]
    fn test_helpers_bubble_to_the_common_scope() {
        let out = lower("function f(){ class A {} } function g(){ class B {} }");
        assert!(out.starts_with(DP));
        assert_eq!(out.matches("Object.defineProperty;").count(), 1);
        assert!(out.contains("function f(){ var A = (function(){"));
    }

    #[test]
    fn test_block_class_is_renamed() {
        let out = lower("var A; { class A {} }");
        assert!(out.contains("var A$0 = (function(){\"use strict\";function A$0(){}"));
    }

    #[test]
    fn test_unsupported_members() {
        assert_eq!(lower_err("class A { x = 1; }").kind, ErrorKind::StructuralAssertion);
        assert_eq!(lower_err("class A { #x; }").kind, ErrorKind::StructuralAssertion);
        assert_eq!(lower_err("class A { static {} }").kind, ErrorKind::StructuralAssertion);
        assert_eq!(
            lower_err("class B extends A { m() { super.x = 1; } }").kind,
            ErrorKind::StructuralAssertion
        );
    }
}
