// This file is part of plversiond, an application exposing programmable logic version information from device-tree described hardware.
//
// Copyright 2025 REDS Institute, HEIG-VD.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// plversiond is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// plversiond is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! Procedural macros for plversiond.
//!
//! `#[platform_driver]` declares a driver name and its device-tree match table on a unit
//! struct and generates the `register_driver` hook used at daemon startup:
//!
//! ```rust,ignore
//! #[platform_driver(
//!     name = "plversion",
//!     compatible = "reds,plversion",
//!     compatible = "xlnx,version-ip-1.0"
//! )]
//! pub struct PlVersionDriver;
//!
//! let mut registry = DriverRegistry::new();
//! PlVersionDriver::register_driver(&mut registry);
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, LitStr, parse_macro_input};

#[proc_macro_attribute]
pub fn platform_driver(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut name: Option<LitStr> = None;
    let mut compatibles: Vec<LitStr> = Vec::new();
    let attr_parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("name") {
            name = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("compatible") {
            compatibles.push(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported platform_driver property, expected `name` or `compatible`"))
        }
    });
    parse_macro_input!(attr with attr_parser);
    let item_struct = parse_macro_input!(item as ItemStruct);
    let ident = &item_struct.ident;

    let Some(name) = name else {
        return syn::Error::new_spanned(ident, "platform_driver requires `name = \"...\"`")
            .to_compile_error()
            .into();
    };
    if compatibles.is_empty() {
        return syn::Error::new_spanned(
            ident,
            "platform_driver requires at least one `compatible = \"...\"`",
        )
        .to_compile_error()
        .into();
    }
    if let Some(empty) = compatibles.iter().find(|c| c.value().is_empty()) {
        return syn::Error::new_spanned(empty, "compatible strings cannot be empty")
            .to_compile_error()
            .into();
    }

    quote! {
        #item_struct

        impl #ident {
            /// Driver name used in log messages.
            pub const NAME: &'static str = #name;

            /// Device-tree compatible strings this driver binds to.
            pub const OF_MATCH_TABLE: &'static [&'static str] = &[#(#compatibles),*];

            /// Add this driver's match table to `registry`.
            pub fn register_driver(registry: &mut crate::registry::DriverRegistry) {
                registry.register_driver(Self::NAME, Self::OF_MATCH_TABLE);
            }
        }
    }
    .into()
}
