//! Class and interface type graph
//!
//! Types live in an arena indexed by [`TypeId`]. Every type keeps the set of
//! identifiers it extends or implements (its own included), so subtype tests
//! are a single hash lookup. The set is filled in by
//! [`TypeGraph::register_child_type`], which pushes a parent's set down into
//! the child and every type that already derives from it.

use crate::error::TypeError;
use crate::primitive::PrimitiveType;
use crate::value::PrimitiveValue;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::sync::Arc;

/// Index of a type in its [`TypeGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// Raw arena index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// Graph-unique field identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(pub(crate) u32);

/// Graph-unique method identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(pub(crate) u32);

impl MethodId {
    /// Raw id
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Declaration kind of a non-primitive type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// `class`
    Class,
    /// `interface`
    Interface,
    /// `enum`
    Enum,
}

/// Member or type visibility, ordered from most to least restrictive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Visibility {
    /// `private`
    Private,
    /// no modifier
    Package,
    /// `protected`
    Protected,
    /// `public`
    Public,
}

impl Visibility {
    /// Parse a modifier keyword
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "private" => Some(Visibility::Private),
            "protected" => Some(Visibility::Protected),
            "public" => Some(Visibility::Public),
            _ => None,
        }
    }
}

/// Reference to a type from a member signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// Primitive (or `String`)
    Primitive(PrimitiveType),
    /// Declared class, interface or enum
    Class(TypeId),
    /// Generic instantiation `Base<Args>`
    Generic(TypeId, Vec<TypeRef>),
    /// Type parameter of the enclosing generic type
    TypeVariable(String),
    /// Array of the element type
    Array(Box<TypeRef>),
}

impl TypeRef {
    /// Replace type variables by the matching arguments
    pub fn substitute(&self, params: &[String], args: &[TypeRef]) -> TypeRef {
        match self {
            TypeRef::TypeVariable(name) => params
                .iter()
                .position(|p| p == name)
                .and_then(|i| args.get(i))
                .cloned()
                .unwrap_or_else(|| self.clone()),
            TypeRef::Generic(base, inner) => TypeRef::Generic(
                *base,
                inner.iter().map(|a| a.substitute(params, args)).collect(),
            ),
            TypeRef::Array(element) => TypeRef::Array(Box::new(element.substitute(params, args))),
            TypeRef::Primitive(_) | TypeRef::Class(_) => self.clone(),
        }
    }
}

/// Method or constructor parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name
    pub identifier: String,
    /// Declared type
    pub ty: TypeRef,
}

impl Parameter {
    pub fn new(identifier: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            identifier: identifier.into(),
            ty,
        }
    }
}

/// Declared field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Assigned by [`TypeGraph::add_field`]
    pub id: FieldId,
    /// Declaring type, assigned by [`TypeGraph::add_field`]
    pub owner: TypeId,
    pub identifier: String,
    pub ty: TypeRef,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    /// Compile-time constant value, if any
    pub constant: Option<PrimitiveValue>,
}

impl Field {
    /// Public instance field
    pub fn new(identifier: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            id: FieldId(0),
            owner: TypeId(0),
            identifier: identifier.into(),
            ty,
            visibility: Visibility::Public,
            is_static: false,
            is_final: false,
            constant: None,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// Static final field with a constant value
    pub fn with_constant(mut self, value: PrimitiveValue) -> Self {
        self.is_static = true;
        self.is_final = true;
        self.constant = Some(value);
        self
    }
}

/// Declared method or constructor
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    /// Assigned by [`TypeGraph::add_method`]
    pub id: MethodId,
    /// Declaring type, assigned by [`TypeGraph::add_method`]
    pub owner: TypeId,
    pub identifier: String,
    pub parameters: Vec<Parameter>,
    /// `void` for constructors
    pub return_type: TypeRef,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_constructor: bool,
    pub is_abstract: bool,
}

impl Method {
    /// Public instance method returning `void`
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            id: MethodId(0),
            owner: TypeId(0),
            identifier: identifier.into(),
            parameters: Vec::new(),
            return_type: TypeRef::Primitive(PrimitiveType::Void),
            visibility: Visibility::Public,
            is_static: false,
            is_constructor: false,
            is_abstract: false,
        }
    }

    /// Public constructor
    pub fn constructor(class_identifier: impl Into<String>) -> Self {
        Self {
            is_constructor: true,
            ..Self::new(class_identifier)
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn returning(mut self, ty: TypeRef) -> Self {
        self.return_type = ty;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }
}

/// Front-end description of a new type
#[derive(Debug, Clone)]
pub struct ClassDeclaration {
    pub identifier: String,
    pub kind: TypeKind,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    /// Enclosing type for nested declarations
    pub outer: Option<TypeId>,
    pub type_parameters: Vec<String>,
}

impl ClassDeclaration {
    fn new(identifier: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            visibility: Visibility::Public,
            is_static: false,
            is_final: false,
            is_abstract: kind == TypeKind::Interface,
            outer: None,
            type_parameters: Vec::new(),
        }
    }

    pub fn class(identifier: impl Into<String>) -> Self {
        Self::new(identifier, TypeKind::Class)
    }

    pub fn interface(identifier: impl Into<String>) -> Self {
        Self::new(identifier, TypeKind::Interface)
    }

    pub fn enumeration(identifier: impl Into<String>) -> Self {
        Self {
            is_final: true,
            ..Self::new(identifier, TypeKind::Enum)
        }
    }

    pub fn nested_in(mut self, outer: TypeId) -> Self {
        self.outer = Some(outer);
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_type_parameters<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_parameters = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_final(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }
}

/// A declared class, interface or enum
#[derive(Debug, Clone)]
pub struct NonPrimitiveType {
    pub id: TypeId,
    pub identifier: String,
    pub kind: TypeKind,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub outer: Option<TypeId>,
    pub inner: Vec<TypeId>,
    /// Direct superclass
    pub superclass: Option<TypeId>,
    /// Directly implemented (or, for interfaces, extended) interfaces
    pub interfaces: Vec<TypeId>,
    /// Types registered as direct children
    pub children: Vec<TypeId>,
    pub type_parameters: Vec<String>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub static_initializer: Option<MethodId>,
    extends_implements: FxHashSet<String>,
}

impl NonPrimitiveType {
    /// O(1) test whether this type is, extends or implements `identifier`
    #[inline]
    pub fn fast_extends_implements(&self, identifier: &str) -> bool {
        self.extends_implements.contains(identifier)
    }

    /// Declared methods of this type only
    pub fn get_own_methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }
}

/// Generic type with its type parameters replaced
#[derive(Debug, Clone, PartialEq)]
pub struct SubstitutedType {
    pub base: TypeId,
    pub arguments: Vec<TypeRef>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
}

/// Arena of all non-primitive types of one program
#[derive(Debug, Default)]
pub struct TypeGraph {
    types: Vec<NonPrimitiveType>,
    by_name: FxHashMap<String, TypeId>,
    /// Owner and slot of every method
    method_slots: FxHashMap<MethodId, (TypeId, usize)>,
    next_member: u32,
    substitutions: Mutex<FxHashMap<(TypeId, Vec<TypeRef>), Arc<SubstitutedType>>>,
}

/// Copies start with an empty substitution cache
impl Clone for TypeGraph {
    fn clone(&self) -> Self {
        Self {
            types: self.types.clone(),
            by_name: self.by_name.clone(),
            method_slots: self.method_slots.clone(),
            next_member: self.next_member,
            substitutions: Mutex::default(),
        }
    }
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of declared types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Declare a new type
    pub fn declare(&mut self, decl: ClassDeclaration) -> Result<TypeId, TypeError> {
        if self.by_name.contains_key(&decl.identifier) {
            return Err(TypeError::DuplicateType {
                name: decl.identifier,
            });
        }
        if let Some(outer) = decl.outer {
            self.get(outer)?;
        }

        let id = TypeId(self.types.len() as u32);
        let mut extends_implements = FxHashSet::default();
        extends_implements.insert(decl.identifier.clone());

        self.types.push(NonPrimitiveType {
            id,
            identifier: decl.identifier.clone(),
            kind: decl.kind,
            visibility: decl.visibility,
            is_static: decl.is_static,
            is_final: decl.is_final,
            is_abstract: decl.is_abstract,
            outer: decl.outer,
            inner: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            children: Vec::new(),
            type_parameters: decl.type_parameters,
            fields: Vec::new(),
            methods: Vec::new(),
            static_initializer: None,
            extends_implements,
        });
        if let Some(outer) = decl.outer {
            self.types[outer.index()].inner.push(id);
        }
        self.by_name.insert(decl.identifier, id);
        Ok(id)
    }

    /// Look a type up by identifier
    pub fn lookup(&self, identifier: &str) -> Option<TypeId> {
        self.by_name.get(identifier).copied()
    }

    /// Look a type up by identifier, failing if it is undeclared
    pub fn require(&self, identifier: &str) -> Result<TypeId, TypeError> {
        self.lookup(identifier).ok_or_else(|| TypeError::UndefinedType {
            name: identifier.to_string(),
        })
    }

    pub fn get(&self, id: TypeId) -> Result<&NonPrimitiveType, TypeError> {
        self.types.get(id.index()).ok_or_else(|| TypeError::UndefinedType {
            name: id.to_string(),
        })
    }

    fn get_mut(&mut self, id: TypeId) -> Result<&mut NonPrimitiveType, TypeError> {
        self.types
            .get_mut(id.index())
            .ok_or_else(|| TypeError::UndefinedType {
                name: id.to_string(),
            })
    }

    /// Identifier of a type, or `"?"` for a stale id
    pub fn name(&self, id: TypeId) -> &str {
        self.types
            .get(id.index())
            .map(|t| t.identifier.as_str())
            .unwrap_or("?")
    }

    /// Nested type of `outer` with the given identifier
    pub fn inner_type(&self, outer: TypeId, identifier: &str) -> Option<TypeId> {
        let outer = self.types.get(outer.index())?;
        outer
            .inner
            .iter()
            .copied()
            .find(|id| self.name(*id) == identifier)
    }

    /// Outermost enclosing type (the type itself when not nested)
    pub fn outermost(&self, id: TypeId) -> TypeId {
        let mut current = id;
        while let Some(outer) = self.types.get(current.index()).and_then(|t| t.outer) {
            current = outer;
        }
        current
    }

    // ========================================================================
    // Inheritance
    // ========================================================================

    /// Make `parent` the superclass of `child`
    pub fn set_superclass(&mut self, child: TypeId, parent: TypeId) -> Result<(), TypeError> {
        let (c, p) = (self.get(child)?, self.get(parent)?);
        if c.is_interface() || p.is_interface() || c.superclass.is_some() || p.is_final {
            return Err(TypeError::InvalidSupertype {
                sub: c.identifier.clone(),
                sup: p.identifier.clone(),
            });
        }
        self.register_child_type(parent, child)?;
        self.get_mut(child)?.superclass = Some(parent);
        Ok(())
    }

    /// Add `interface` to the implemented (or extended) interfaces of `child`
    pub fn add_interface(&mut self, child: TypeId, interface: TypeId) -> Result<(), TypeError> {
        let (c, i) = (self.get(child)?, self.get(interface)?);
        if !i.is_interface() || c.interfaces.contains(&interface) {
            return Err(TypeError::InvalidSupertype {
                sub: c.identifier.clone(),
                sup: i.identifier.clone(),
            });
        }
        self.register_child_type(interface, child)?;
        self.get_mut(child)?.interfaces.push(interface);
        Ok(())
    }

    /// Link `child` below `parent` and propagate the extends set downward
    pub fn register_child_type(&mut self, parent: TypeId, child: TypeId) -> Result<(), TypeError> {
        let child_name = self.get(child)?.identifier.clone();
        let parent_ty = self.get(parent)?;
        if parent_ty.fast_extends_implements(&child_name) {
            return Err(TypeError::CircularReference {
                cycle: format!("{} -> {}", child_name, parent_ty.identifier),
            });
        }

        let inherited: Vec<String> = parent_ty.extends_implements.iter().cloned().collect();
        self.get_mut(parent)?.children.push(child);

        let mut pending = vec![child];
        let mut seen = FxHashSet::default();
        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            let ty = self.get_mut(id)?;
            ty.extends_implements.extend(inherited.iter().cloned());
            pending.extend(ty.children.iter().copied());
        }
        Ok(())
    }

    /// `sub` is `sup` or derives from it
    pub fn is_subtype(&self, sub: TypeId, sup: TypeId) -> bool {
        match (self.types.get(sub.index()), self.types.get(sup.index())) {
            (Some(sub), Some(sup)) => sub.fast_extends_implements(&sup.identifier),
            _ => false,
        }
    }

    /// Own identifier followed by every supertype, nearest first
    pub fn ancestors(&self, id: TypeId) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        let mut queue = std::collections::VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            let Some(ty) = self.types.get(current.index()) else {
                continue;
            };
            if !seen.insert(current) {
                continue;
            }
            out.push(ty.identifier.clone());
            queue.extend(ty.superclass);
            queue.extend(ty.interfaces.iter().copied());
        }
        out
    }

    /// Direct supertypes: superclass first, then interfaces in declaration order
    fn direct_supertypes(&self, ty: &NonPrimitiveType) -> Vec<TypeId> {
        ty.superclass
            .into_iter()
            .chain(ty.interfaces.iter().copied())
            .collect()
    }

    // ========================================================================
    // Members
    // ========================================================================

    pub fn add_field(&mut self, owner: TypeId, mut field: Field) -> Result<FieldId, TypeError> {
        let id = FieldId(self.next_member);
        self.next_member += 1;
        field.id = id;
        field.owner = owner;
        self.get_mut(owner)?.fields.push(field);
        Ok(id)
    }

    pub fn add_method(&mut self, owner: TypeId, mut method: Method) -> Result<MethodId, TypeError> {
        let id = MethodId(self.next_member);
        self.next_member += 1;
        method.id = id;
        method.owner = owner;
        let methods = &mut self.get_mut(owner)?.methods;
        methods.push(method);
        let slot = methods.len() - 1;
        self.method_slots.insert(id, (owner, slot));
        Ok(id)
    }

    /// Wire the static initializer after declaration; returns the previous one
    pub fn set_static_initializer(
        &mut self,
        ty: TypeId,
        initializer: MethodId,
    ) -> Result<Option<MethodId>, TypeError> {
        Ok(self.get_mut(ty)?.static_initializer.replace(initializer))
    }

    pub fn method(&self, id: MethodId) -> Option<&Method> {
        let (owner, slot) = self.method_slots.get(&id)?;
        self.types.get(owner.index())?.methods.get(*slot)
    }

    pub fn get_own_methods(&self, ty: TypeId) -> Result<&[Method], TypeError> {
        Ok(self.get(ty)?.get_own_methods())
    }

    /// Own methods followed by all inherited ones, each method once
    pub fn get_all_methods(&self, ty: TypeId) -> Result<Vec<&Method>, TypeError> {
        self.get(ty)?;
        let mut out = Vec::new();
        let mut seen_methods = FxHashSet::default();
        let mut seen_types = FxHashSet::default();
        let mut pending = vec![ty];
        while let Some(id) = pending.pop() {
            if !seen_types.insert(id) {
                continue;
            }
            let current = self.get(id)?;
            for m in &current.methods {
                if seen_methods.insert(m.id) {
                    out.push(m);
                }
            }
            // reversed so the superclass is visited before interfaces
            pending.extend(self.direct_supertypes(current).into_iter().rev());
        }
        Ok(out)
    }

    /// Find a field by name, searching superclasses
    ///
    /// `ceiling` is the most restrictive visibility the caller may see;
    /// inherited fields are never seen below `Protected`.
    pub fn get_field(
        &self,
        ty: TypeId,
        identifier: &str,
        ceiling: Visibility,
        force_static: bool,
    ) -> Option<&Field> {
        let current = self.types.get(ty.index())?;
        let own = current.fields.iter().find(|f| {
            f.identifier == identifier && f.visibility >= ceiling && (!force_static || f.is_static)
        });
        if own.is_some() {
            return own;
        }
        let inherited_ceiling = ceiling.max(Visibility::Protected);
        self.direct_supertypes(current)
            .into_iter()
            .find_map(|s| self.get_field(s, identifier, inherited_ceiling, force_static))
    }

    /// Candidate methods for a call
    ///
    /// Duplicates reached along several inheritance paths are kept; picking an
    /// overload is the caller's job.
    pub fn get_possible_methods(
        &self,
        ty: TypeId,
        identifier: &str,
        is_constructor: bool,
        has_to_be_static: bool,
    ) -> Vec<&Method> {
        if is_constructor {
            let mut current = self.types.get(ty.index());
            while let Some(t) = current {
                let ctors: Vec<&Method> = t.methods.iter().filter(|m| m.is_constructor).collect();
                if !ctors.is_empty() {
                    return ctors;
                }
                current = t.superclass.and_then(|s| self.types.get(s.index()));
            }
            return Vec::new();
        }

        let mut out = Vec::new();
        self.collect_methods(ty, identifier, has_to_be_static, &mut out);
        out
    }

    fn collect_methods<'a>(
        &'a self,
        ty: TypeId,
        identifier: &str,
        has_to_be_static: bool,
        out: &mut Vec<&'a Method>,
    ) {
        let Some(current) = self.types.get(ty.index()) else {
            return;
        };
        out.extend(current.methods.iter().filter(|m| {
            !m.is_constructor && m.identifier == identifier && (!has_to_be_static || m.is_static)
        }));
        for s in self.direct_supertypes(current) {
            self.collect_methods(s, identifier, has_to_be_static, out);
        }
    }

    /// Whether a member of `declaring` with `visibility` is accessible from `accessor`
    pub fn is_visible_from(&self, declaring: TypeId, visibility: Visibility, accessor: TypeId) -> bool {
        if visibility == Visibility::Public {
            return true;
        }
        let outer = self.outermost(declaring);
        if outer == self.outermost(accessor) {
            return true;
        }
        if visibility == Visibility::Protected {
            if let Ok(acc) = self.get(accessor) {
                return acc.fast_extends_implements(self.name(outer))
                    || acc.fast_extends_implements(self.name(declaring));
            }
        }
        false
    }

    // ========================================================================
    // Generics
    // ========================================================================

    /// View of a generic type with its parameters replaced, computed once per argument list
    pub fn substituted(
        &self,
        ty: TypeId,
        arguments: &[TypeRef],
    ) -> Result<Arc<SubstitutedType>, TypeError> {
        let base = self.get(ty)?;
        if base.type_parameters.len() != arguments.len() {
            return Err(TypeError::InvalidTypeArgCount {
                name: base.identifier.clone(),
                expected: base.type_parameters.len(),
                actual: arguments.len(),
            });
        }

        let key = (ty, arguments.to_vec());
        let mut cache = self.substitutions.lock();
        if let Some(hit) = cache.get(&key) {
            return Ok(hit.clone());
        }

        let params = &base.type_parameters;
        let fields = base
            .fields
            .iter()
            .map(|f| Field {
                ty: f.ty.substitute(params, arguments),
                ..f.clone()
            })
            .collect();
        let methods = base
            .methods
            .iter()
            .map(|m| Method {
                parameters: m
                    .parameters
                    .iter()
                    .map(|p| Parameter::new(p.identifier.clone(), p.ty.substitute(params, arguments)))
                    .collect(),
                return_type: m.return_type.substitute(params, arguments),
                ..m.clone()
            })
            .collect();

        let view = Arc::new(SubstitutedType {
            base: ty,
            arguments: arguments.to_vec(),
            fields,
            methods,
        });
        cache.insert(key, view.clone());
        Ok(view)
    }

    /// Source-like rendering of a type reference
    pub fn display_ref(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Primitive(p) => p.name().to_string(),
            TypeRef::Class(id) => self.name(*id).to_string(),
            TypeRef::Generic(id, args) => format!(
                "{}<{}>",
                self.name(*id),
                args.iter()
                    .map(|a| self.display_ref(a))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            TypeRef::TypeVariable(name) => name.clone(),
            TypeRef::Array(element) => format!("{}[]", self.display_ref(element)),
        }
    }

    /// Dispatch key `name(type,type)` of a method
    pub fn method_signature(&self, method: &Method) -> String {
        format!(
            "{}({})",
            method.identifier,
            method
                .parameters
                .iter()
                .map(|p| self.display_ref(&p.ty))
                .collect::<Vec<_>>()
                .join(",")
        )
    }
}
