/// Declares one of the string enums of the WebIDL surface. The enum gets an
/// `Unspecified` default in front of the listed values, and each value maps
/// to and from its IDL spelling through `From<&str>`, `Display` and serde.
/// Unknown strings read as `Unspecified` through `From<&str>`, but fail to
/// deserialize.
///
/// Values are numbered from 0 in declaration order, `Unspecified` first, so
/// `as u8` and `From<u8>` round-trip for atomic storage.
macro_rules! idl_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $idl:literal,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Default,
            Debug,
            Copy,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        $vis enum $name {
            #[default]
            #[serde(skip)]
            Unspecified,
            $(
                $(#[$variant_meta])*
                #[serde(rename = $idl)]
                $variant,
            )+
        }

        impl $name {
            /// The IDL spelling, `Unspecified` for the default.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $name::Unspecified => $crate::UNSPECIFIED_STR,
                    $($name::$variant => $idl,)+
                }
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                match raw {
                    $($idl => $name::$variant,)+
                    _ => $name::Unspecified,
                }
            }
        }

        impl From<u8> for $name {
            fn from(v: u8) -> Self {
                const VALUES: &[$name] = &[$name::Unspecified, $($name::$variant,)+];
                VALUES.get(v as usize).copied().unwrap_or_default()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}
