//! Derive macro for joinery table definitions.
//!
//! `#[derive(Table)]` turns a row struct into static table metadata, a
//! typed table handle with one accessor per column and one navigation
//! method per foreign key.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, GenericArgument, Ident, Lit,
    Meta, Path, PathArguments, Type,
};

/// Derives `joinery_core::Table` for a row struct.
///
/// # Attributes
///
/// - `#[table(name = "table_name")]` - the SQL table name (optional,
///   defaults to the snake_case struct name)
///
/// # Field Attributes
///
/// - `#[column(primary_key)]` - part of the primary key
/// - `#[column(generated)]` - assigned by the database on insert
/// - `#[column(nullable)]` - admits NULL; implied by an `Option<T>` field
/// - `#[column(name = "column_name")]` - the SQL column name (optional,
///   defaults to the field name)
/// - `#[column(references = Club)]` - foreign key to the table of the row
///   struct `Club`, matched against its primary key
/// - `#[column(navigation = "home")]` - name of the navigation method
///   (defaults to the field name without its `_id` suffix)
///
/// # Generated Items
///
/// For a struct `Athlete`:
///
/// - `AthleteTable` - the table handle, implementing `Table`
/// - one `Field` accessor per column and one navigation method per foreign
///   key on `AthleteTable`
/// - `impl TableRow for Athlete`
/// - `Athlete::table()` returning the root handle
#[proc_macro_derive(Table, attributes(table, column))]
pub fn derive_table(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_table_impl(&input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

struct ColumnInfo {
    field_name: Ident,
    field_type: Type,
    /// The `T` of `Field<_, T>`: the field type without `Option`.
    value_type: Type,
    column_name: String,
    primary_key: bool,
    generated: bool,
    nullable: bool,
    references: Option<Path>,
    navigation: Option<String>,
}

#[derive(Default)]
struct ColumnAttrs {
    name: Option<String>,
    primary_key: bool,
    generated: bool,
    nullable: bool,
    references: Option<Path>,
    navigation: Option<String>,
}

fn derive_table_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let table_name = get_table_name(&input.attrs, struct_name)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Table derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Table derive only supports structs",
            ));
        }
    };

    let mut columns: Vec<ColumnInfo> = Vec::new();
    for field in fields {
        let Some(field_name) = field.ident.clone() else {
            return Err(syn::Error::new_spanned(field, "unnamed field"));
        };
        let attrs = parse_column_attrs(&field.attrs)?;
        let (value_type, optional) = match option_inner(&field.ty) {
            Some(inner) => (inner.clone(), true),
            None => (field.ty.clone(), false),
        };
        if attrs.navigation.is_some() && attrs.references.is_none() {
            return Err(syn::Error::new_spanned(
                &field.ty,
                "`navigation` needs `references`",
            ));
        }
        columns.push(ColumnInfo {
            column_name: attrs.name.unwrap_or_else(|| field_name.to_string()),
            field_name,
            field_type: field.ty.clone(),
            value_type,
            primary_key: attrs.primary_key,
            generated: attrs.generated,
            nullable: attrs.nullable || optional,
            references: attrs.references,
            navigation: attrs.navigation,
        });
    }

    let handle = format_ident!("{}Table", struct_name);
    let column_count = columns.len();

    let column_defs: Vec<TokenStream2> = columns
        .iter()
        .map(|c| {
            let name = &c.column_name;
            let value_type = &c.value_type;
            let nullable = c.nullable;
            let primary_key = c.primary_key;
            let generated = c.generated;
            quote! {
                ::joinery_core::ColumnDef {
                    name: #name,
                    data_type: <#value_type as ::joinery_core::SqlType>::DATA_TYPE,
                    nullable: #nullable,
                    primary_key: #primary_key,
                    generated: #generated,
                }
            }
        })
        .collect();

    let primary_key: Vec<&str> = columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.column_name.as_str())
        .collect();

    let navigations: Vec<(Ident, String, &ColumnInfo, &Path)> = columns
        .iter()
        .filter_map(|c| {
            let target = c.references.as_ref()?;
            let name = c
                .navigation
                .clone()
                .unwrap_or_else(|| navigation_name(&c.field_name.to_string()));
            Some((format_ident!("{}", name), name, c, target))
        })
        .collect();

    let foreign_key_defs: Vec<TokenStream2> = navigations
        .iter()
        .map(|(_, name, column, target)| {
            let column_name = &column.column_name;
            quote! {
                ::joinery_core::ForeignKeyDef {
                    name: #name,
                    columns: &[#column_name],
                    target: || {
                        <<#target as ::joinery_core::TableRow>::Table as ::joinery_core::Table>::DEF
                    },
                    target_columns: &[],
                }
            }
        })
        .collect();

    let column_accessors: Vec<TokenStream2> = columns
        .iter()
        .enumerate()
        .map(|(index, c)| {
            let method = &c.field_name;
            let value_type = &c.value_type;
            let doc = format!("The `{table_name}.{}` column.", c.column_name);
            quote! {
                #[doc = #doc]
                #[must_use]
                pub fn #method(&self) -> ::joinery_core::Field<Self, #value_type> {
                    ::joinery_core::Field::new(
                        self.path.clone(),
                        &<Self as ::joinery_core::Table>::DEF.columns[#index],
                    )
                }
            }
        })
        .collect();

    let navigation_accessors: Vec<TokenStream2> = navigations
        .iter()
        .map(|(method, name, column, target)| {
            let doc = format!(
                "Navigates along `{}` to the referenced row; using it adds one INNER JOIN.",
                column.column_name
            );
            quote! {
                #[doc = #doc]
                #[must_use]
                pub fn #method(&self) -> <#target as ::joinery_core::TableRow>::Table {
                    type Target = <#target as ::joinery_core::TableRow>::Table;
                    <Target as ::joinery_core::Table>::from_path(self.path.navigate(
                        #name,
                        <Target as ::joinery_core::Table>::DEF.name,
                    ))
                }
            }
        })
        .collect();

    let decode_fields: Vec<TokenStream2> = columns
        .iter()
        .map(|c| {
            let field = &c.field_name;
            let field_type = &c.field_type;
            let name = &c.column_name;
            quote! {
                #field: ::joinery_core::row::decode_column::<#field_type>(&mut values, #name)?
            }
        })
        .collect();

    let encode_fields: Vec<TokenStream2> = columns
        .iter()
        .map(|c| {
            let field = &c.field_name;
            quote! { ::joinery_core::ToSqlValue::to_sql_value(self.#field) }
        })
        .collect();

    let handle_doc = format!("Typed handle on the `{table_name}` table.");

    Ok(quote! {
        #[doc = #handle_doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct #handle {
            path: ::joinery_core::TablePath,
        }

        impl ::joinery_core::Table for #handle {
            type Row = #struct_name;

            const DEF: &'static ::joinery_core::TableDef = &::joinery_core::TableDef {
                name: #table_name,
                columns: &[#(#column_defs),*],
                primary_key: &[#(#primary_key),*],
                foreign_keys: &[#(#foreign_key_defs),*],
            };

            fn from_path(path: ::joinery_core::TablePath) -> Self {
                Self { path }
            }

            fn path(&self) -> &::joinery_core::TablePath {
                &self.path
            }
        }

        impl ::core::default::Default for #handle {
            fn default() -> Self {
                <Self as ::joinery_core::Table>::root()
            }
        }

        impl #handle {
            #(#column_accessors)*

            #(#navigation_accessors)*
        }

        impl ::joinery_core::TableRow for #struct_name {
            type Table = #handle;

            fn from_values(
                values: ::std::vec::Vec<::joinery_core::SqlValue>,
            ) -> ::joinery_core::Result<Self> {
                if values.len() != #column_count {
                    return Err(::joinery_core::Error::mapping(format!(
                        "`{}` has {} column(s), row has {}",
                        #table_name,
                        #column_count,
                        values.len()
                    )));
                }
                let mut values = values.into_iter();
                Ok(Self {
                    #(#decode_fields),*
                })
            }

            fn into_values(self) -> ::std::vec::Vec<::joinery_core::SqlValue> {
                vec![#(#encode_fields),*]
            }
        }

        impl #struct_name {
            /// The root handle on this table.
            #[must_use]
            pub fn table() -> #handle {
                <#handle as ::joinery_core::Table>::root()
            }
        }
    })
}

fn get_table_name(attrs: &[Attribute], struct_name: &Ident) -> syn::Result<String> {
    for attr in attrs {
        if attr.path().is_ident("table") {
            let mut table_name = None;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    table_name = Some(string_value(&meta.value()?.parse()?, &meta.path)?);
                    Ok(())
                } else {
                    Err(meta.error("unknown table attribute"))
                }
            })?;
            if let Some(name) = table_name {
                return Ok(name);
            }
        }
    }
    Ok(to_snake_case(&struct_name.to_string()))
}

fn parse_column_attrs(attrs: &[Attribute]) -> syn::Result<ColumnAttrs> {
    let mut result = ColumnAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("column") || matches!(attr.meta, Meta::Path(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("primary_key") {
                result.primary_key = true;
            } else if meta.path.is_ident("generated") {
                result.generated = true;
            } else if meta.path.is_ident("nullable") {
                result.nullable = true;
            } else if meta.path.is_ident("name") {
                result.name = Some(string_value(&meta.value()?.parse()?, &meta.path)?);
            } else if meta.path.is_ident("navigation") {
                result.navigation = Some(string_value(&meta.value()?.parse()?, &meta.path)?);
            } else if meta.path.is_ident("references") {
                result.references = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("unknown column attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

fn string_value(value: &Expr, path: &Path) -> syn::Result<String> {
    if let Expr::Lit(lit) = value {
        if let Lit::Str(s) = &lit.lit {
            return Ok(s.value());
        }
    }
    Err(syn::Error::new_spanned(path, "expected a string literal"))
}

/// `T` for a field of type `Option<T>`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

fn navigation_name(field: &str) -> String {
    field
        .strip_suffix("_id")
        .filter(|stem| !stem.is_empty())
        .map_or_else(|| format!("{field}_ref"), str::to_string)
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
