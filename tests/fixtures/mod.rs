//! Request bodies and expectations for E2E storefront flows

/// A shipping address as the storefront submits it.
#[derive(Debug, Clone)]
pub struct AddressFixture {
    pub name: &'static str,
    pub phone: &'static str,
    pub address_line1: &'static str,
    pub address_line2: Option<&'static str>,
    pub city: &'static str,
    pub state: &'static str,
    pub pincode: &'static str,
    /// The order snapshot text this address must produce.
    pub expected_snapshot: &'static str,
}

pub const ADDRESS_FIXTURES: &[AddressFixture] = &[
    AddressFixture {
        name: "Asha Rao",
        phone: "9876543210",
        address_line1: "12 MG Road",
        address_line2: None,
        city: "Pune",
        state: "Maharashtra",
        pincode: "411001",
        expected_snapshot: "Asha Rao, 9876543210\n12 MG Road\nPune, Maharashtra - 411001",
    },
    AddressFixture {
        name: "Vikram Shah",
        phone: "9123456780",
        address_line1: "Flat 4B, Lake View",
        address_line2: Some("Near City Park"),
        city: "Ahmedabad",
        state: "Gujarat",
        pincode: "380015",
        expected_snapshot:
            "Vikram Shah, 9123456780\nFlat 4B, Lake View\nNear City Park\nAhmedabad, Gujarat - 380015",
    },
];

/// Batch seeded by the `seed` binary.
pub const SEED_BATCH_ID: &str = "AMR-001";

/// Accepted when dummy OTPs are enabled (development).
pub const DUMMY_OTP: &str = "123456";

/// Phone numbers in the formats customers type them, with the normalized form.
pub const PHONE_FIXTURES: &[(&str, &str)] = &[
    ("98765 43210", "9876543210"),
    ("+91-98765-43210", "919876543210"),
    ("(0) 98765 43210", "09876543210"),
];

/// Smallest file the upload endpoint accepts as a PDF.
pub const MINIMAL_PDF: &[u8] = b"%PDF-1.4\n1 0 obj <<>> endobj\ntrailer <<>>\n%%EOF\n";
