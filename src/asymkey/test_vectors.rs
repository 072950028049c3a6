//! Signature fixtures over real git payloads.

pub(crate) const SSH_PUBLIC_KEY: &str =
    "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIKBknvWcuxM/W0iXGkzY4f2O6feX+Q7o46pKcxUbcOgh";

pub(crate) const SSH_FINGERPRINT: &str = "SHA256:TKfwbZMR7e9OnlV2l1prfah1TXH8CmqR0PvFEXVCXA4";

pub(crate) const COMMIT_PAYLOAD: &str = "tree 853694aae8816094a0d875fee7ea26278dbf5d0f
parent c2780d5c313da2a947eae22efd7dacf4213f4e7f
author user2 <user2@example.com> 1699707877 +0100
committer user2 <user2@example.com> 1699707877 +0100

Add content
";

pub(crate) const COMMIT_SSH_SIGNATURE: &str = "-----BEGIN SSH SIGNATURE-----
U1NIU0lHAAAAAQAAADMAAAALc3NoLWVkMjU1MTkAAAAgoGSe9Zy7Ez9bSJcaTNjh/Y7p95
f5DujjqkpzFRtw6CEAAAADZ2l0AAAAAAAAAAZzaGE1MTIAAABTAAAAC3NzaC1lZDI1NTE5
AAAAQBe2Fwk/FKY3SBCnG6jSYcO6ucyahp2SpQ/0P+otslzIHpWNW8cQ0fGLdhhaFynJXQ
fs9cMpZVM9BfIKNUSO8QY=
-----END SSH SIGNATURE-----
";

pub(crate) const NOREPLY_PAYLOAD: &str = "tree 4836c7f639f37388bab4050ef5c97bbbd54272fc
parent 795be1b0117ea5c65456050bb9fd84744d4fd9c6
author user2 <user2@noreply.example.com> 1699709594 +0100
committer user2 <user2@noreply.example.com> 1699709594 +0100

Commit with noreply
";

pub(crate) const NOREPLY_SSH_SIGNATURE: &str = "-----BEGIN SSH SIGNATURE-----
U1NIU0lHAAAAAQAAADMAAAALc3NoLWVkMjU1MTkAAAAgoGSe9Zy7Ez9bSJcaTNjh/Y7p95
f5DujjqkpzFRtw6CEAAAADZ2l0AAAAAAAAAAZzaGE1MTIAAABTAAAAC3NzaC1lZDI1NTE5
AAAAQJz83KKxD6Bz/ZvNpqkA3RPOSQ4LQ5FfEItbtoONkbwV9wAWMnmBqgggo/lnXCJ3oq
muPLbvEduU+Ze/1Ol1pgk=
-----END SSH SIGNATURE-----
";

/// RSA key of `user2 <user2@example.com>`, key id `1F1659493C91227C`.
pub(crate) const GPG_PUBLIC_KEY: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----

mQENBGrR11kBCADShYxkh9HJ+OeTgiVWM4g80rdk3/yunP2uDgK557eg0osh88D8
XRe8rrkJIwDzSZxiz4xqGRNgGLSB9kwMWiiBca6+R1JQPcGihtTYli/YAc18pW7A
pB6SFlsy6e/KMqJWX1fLpLyaTv8FyhvnxSUFtzpCenIvoekZW0+JCN7JCZxES8iX
5u5gLh0+uV8TmmEZXaQd7QHuENfUgsIOYaNeGQdnucNRgnTtFCR88DbMsy3rcxly
5um4cpSzKI2IOhdpgHRpR35HGFWAfHavxhIbVXpYXXSwlrxd19JfA318h9p+1+aq
ZCkCB96UYcMg4pixoAeH4js6fG6AXdhpd+FJABEBAAG0GXVzZXIyIDx1c2VyMkBl
eGFtcGxlLmNvbT6JAU4EEwEKADgWIQSwL3wqQ6sghD4AICIfFllJPJEifAUCatHX
WQIbAwULCQgHAgYVCgkICwIEFgIDAQIeAQIXgAAKCRAfFllJPJEifA3ZCAC1AaWp
OhERhcKH+6ugkLlVpMde0mtp0CAazKxUl6b6VqlJ0G55ydwAWQQdLsy1UcRFduMI
IInbYlwG/z9UihnucdMFJWYwACSLPvjkcry4Bh7tEBiCD6GvtHHqN73M4XjhJiQn
PT03O2Z1Tvf6006dwvYs4SkLVsZqndu9UzT4VvCXLydfBY4FDCkuLqXFh+iR/aAK
ULUKdyWaWsq8ui0rnvrVvkZjxl3731dBoLewSN5J3aJfyK6rHKTWQVL7lN99/InL
QvJzNNh9YxRlr2Pz0V0L17AUnR4LBe0nMfQ74mU37qtT2RYJ896W7lEYtAjc2dCK
XCf77syF42kP0Ufj
=Ile4
-----END PGP PUBLIC KEY BLOCK-----
";

pub(crate) const GPG_KEY_ID: &str = "1F1659493C91227C";

/// Detached signature of [`COMMIT_PAYLOAD`] by [`GPG_PUBLIC_KEY`].
pub(crate) const COMMIT_GPG_SIGNATURE: &str = "-----BEGIN PGP SIGNATURE-----

iQEzBAABCgAdFiEEsC98KkOrIIQ+ACAiHxZZSTyRInwFAmrR11kACgkQHxZZSTyR
InwA7wgAzbn6kvJR+Qif2QQ39yHrlJvtshNe2GpaXjh43JXFFybJlfVFExwPL8RK
2YhlXbT5yHFB7I3tr37Kg2UJXGOujIhg3Tk+pu/1GIOwO7UHAXbOvczmNlmQi6my
AsSowLFHsefbcC48zH0t5aDXG29R/qtxiIxpS6jzXfPs+z9QGAz2SryBMERX+xvD
jCz9r9gQw2aCUUtgdMlw8c0gMAW6p6DFGeadImv2o87oH6ZCnGAe6z9lNa8cNqkh
6l/3vrr7o34BTrVAbDf1FQV/65yWbX8h92e2V5/y9bnNtzBCIDKzVVnx9J3XSRCa
lxSm7sKH/R1i0jnicBqSG7nDuuHz/Q==
=ouRI
-----END PGP SIGNATURE-----
";

/// Ed25519 key of `user5 <user5@example.com>` with a signing subkey.
pub(crate) const GPG_SUBKEY_PUBLIC_KEY: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----

mDMEatHXYBYJKwYBBAHaRw8BAQdA8iCNKr4IQbvIMWCeKoSXJ58yLLj9q028zTv0
r+a2OVm0GXVzZXI1IDx1c2VyNUBleGFtcGxlLmNvbT6IkAQTFggAOBYhBC2UqCq7
agKUwIzgUjBZFFWfX8DQBQJq0ddgAhsBBQsJCAcCBhUKCQgLAgQWAgMBAh4BAheA
AAoJEDBZFFWfX8DQRPwA/iigthnP2LKLXH3R7ydc3eVqQfJ/2Ecnkx8MZRuESlWr
AQCnVhr/PYcCmtVgJjHRkxvtjNQKh5Xb3pPaGwD1DiltCrgzBGrR12AWCSsGAQQB
2kcPAQEHQAt73nBzphm5gpSQtJgY58uYABByTjzNNXtttL+c+AhUiO8EGBYIACAW
IQQtlKgqu2oClMCM4FIwWRRVn1/A0AUCatHXYAIbAgCBCRAwWRRVn1/A0HYgBBkW
CAAdFiEEBbZ137V717wd0kIbHVPJ6xdPH50FAmrR12AACgkQHVPJ6xdPH51v/QD/
SEJ01zPLzw4x015q/UWHqRP3vg8Uz9HLUbCqIoe6XBoBALG6VaW377YsG5IG7Ibu
VBxveoLioAVPy3odFK0KIbIK3XcBAKLhxzDrpiGQj9hGvpg6hSE7H6PFiwrWfdJT
1Z7YALTUAP48Kh3uTK4MJeeyvnkW2YliO7j8v0xnYB2eSkV/qkxGAw==
=qaen
-----END PGP PUBLIC KEY BLOCK-----
";

pub(crate) const GPG_SIGNING_SUBKEY_ID: &str = "1D53C9EB174F1F9D";

pub(crate) const TAG_PAYLOAD: &str = "object 853694aae8816094a0d875fee7ea26278dbf5d0f
type commit
tag v1.0.0
tagger user5 <user5@example.com> 1699707877 +0100

Release v1.0.0
";

/// Detached signature of [`TAG_PAYLOAD`] by the subkey of [`GPG_SUBKEY_PUBLIC_KEY`].
pub(crate) const TAG_GPG_SIGNATURE: &str = "-----BEGIN PGP SIGNATURE-----

iHUEABYIAB0WIQQFtnXftXvXvB3SQhsdU8nrF08fnQUCatHXYAAKCRAdU8nrF08f
nYr+AQDxx1B6rl7AXZbPfm60I0Q3ez2fXMFGl0DxSZRMUnDATAEA+bD3c8a5IZ65
WNCsBt3N2W7Xy/hpVjvDcJ9HCQ/9vQo=
=2HQK
-----END PGP SIGNATURE-----
";
