//! `define_port_error!` declares the error enums of driven ports.
//!
//! Adapters only ever report a kind plus free text, so every variant carries
//! a single `message`. The macro derives `thiserror` with the given prefix,
//! a snake_case constructor per variant and a [`message`] accessor.
//!
//! [`message`]: #method.message

macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $prefix:literal
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error("{}: {message}", $prefix)]
                $variant { message: String },
            )*
        }

        impl $name {
            $(
                ::paste::paste! {
                    #[doc = concat!("Build the `", stringify!($variant), "` variant.")]
                    #[must_use]
                    pub fn [<$variant:snake>](message: impl Into<String>) -> Self {
                        Self::$variant { message: message.into() }
                    }
                }
            )*

            /// Adapter-supplied detail, without the kind prefix.
            #[must_use]
            pub fn message(&self) -> &str {
                match self {
                    $( Self::$variant { message } => message, )*
                }
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    define_port_error! {
        pub enum GatewayError {
            Timeout => "gateway timed out",
            Refused => "gateway refused request",
        }
    }

    #[rstest]
    #[case(GatewayError::timeout("after 5s"), "gateway timed out: after 5s")]
    #[case(GatewayError::refused(String::from("quota")), "gateway refused request: quota")]
    fn display_prefixes_the_message(#[case] err: GatewayError, #[case] expected: &str) {
        assert_eq!(err.to_string(), expected);
    }

    #[rstest]
    fn message_strips_the_prefix() {
        let err = GatewayError::Refused {
            message: "quota".to_owned(),
        };
        assert_eq!(err.message(), "quota");
        assert_eq!(err, GatewayError::refused("quota"));
    }
}
