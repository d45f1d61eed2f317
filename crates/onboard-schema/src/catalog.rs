//! Static stage catalogue
//!
//! Every stage declares its canonical fields, their priority-ordered alias
//! lists, value rules and the required-for-completion subset. Collection
//! stages declare the collection key plus the per-entity schema and natural
//! key.

use onboard_model::{FieldKind, FieldValue, Stage};
use once_cell::sync::Lazy;

/// Coercion and type rule for one field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRule {
    /// Trimmed free text; numbers are accepted and rendered as text
    Text,
    /// Email address, stored lowercased
    Email,
    /// Absolute http(s) URL
    Url,
    /// Whole number with optional inclusive bounds
    Integer {
        /// Lower bound
        min: Option<i64>,
        /// Upper bound
        max: Option<i64>,
    },
    /// Real number with optional inclusive bounds
    Decimal {
        /// Lower bound
        min: Option<f64>,
        /// Upper bound
        max: Option<f64>,
    },
    /// Boolean, with boolean-ish strings accepted
    Boolean,
    /// Closed set of uppercase variants
    Enum(&'static [&'static str]),
    /// Timestamp, with several date spellings accepted
    Date,
    /// Array of child entities (collection stages only)
    Collection,
}

impl ValueRule {
    /// Type tag for field progress rows
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        match self {
            ValueRule::Text => FieldKind::Text,
            ValueRule::Email => FieldKind::Email,
            ValueRule::Url => FieldKind::Url,
            ValueRule::Integer { .. } => FieldKind::Integer,
            ValueRule::Decimal { .. } => FieldKind::Decimal,
            ValueRule::Boolean => FieldKind::Boolean,
            ValueRule::Enum(_) => FieldKind::Enum,
            ValueRule::Date => FieldKind::Date,
            ValueRule::Collection => FieldKind::Collection,
        }
    }
}

/// Value the validator supplies for a field a new entity omits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// Constant boolean
    Boolean(bool),
    /// Position of the entity in the submitted array
    ElementIndex,
}

/// Declaration of one canonical field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Canonical name
    pub name: &'static str,
    /// Aliases in priority order (the canonical name is implicitly first)
    pub aliases: &'static [&'static str],
    /// Coercion rule
    pub rule: ValueRule,
    /// Required for completion / final submit
    pub required: bool,
    /// Masked in field progress
    pub sensitive: bool,
    /// Default for newly created entities
    pub default: Option<FieldDefault>,
}

impl FieldSpec {
    /// Optional field
    #[must_use]
    pub fn new(name: &'static str, rule: ValueRule, aliases: &'static [&'static str]) -> Self {
        Self {
            name,
            aliases,
            rule,
            required: false,
            sensitive: false,
            default: None,
        }
    }

    /// Mark required
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark sensitive
    #[must_use]
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Set the new-entity default
    #[must_use]
    pub fn default_to(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self
    }

    /// Canonical name followed by aliases, in match priority order
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }

    /// Type tag
    #[inline]
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.rule.kind()
    }
}

/// Fields a natural key is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyShape {
    /// A single field
    Field(&'static str),
    /// All listed fields, joined
    Composite(&'static [&'static str]),
    /// The first listed field that is present
    FirstOf(&'static [&'static str]),
}

/// How a collection entity is matched against stored rows
///
/// Key parts are trimmed; they are lowercased only for keys declared
/// [`case_insensitive`](Self::case_insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaturalKey {
    shape: KeyShape,
    fold_case: bool,
}

impl NaturalKey {
    /// Key on a single field
    #[inline]
    #[must_use]
    pub const fn field(field: &'static str) -> Self {
        Self {
            shape: KeyShape::Field(field),
            fold_case: false,
        }
    }

    /// Key on every listed field, `::`-joined
    #[inline]
    #[must_use]
    pub const fn composite(fields: &'static [&'static str]) -> Self {
        Self {
            shape: KeyShape::Composite(fields),
            fold_case: false,
        }
    }

    /// Key on the first listed field present
    #[inline]
    #[must_use]
    pub const fn first_of(fields: &'static [&'static str]) -> Self {
        Self {
            shape: KeyShape::FirstOf(fields),
            fold_case: false,
        }
    }

    /// Compare key parts ignoring case
    #[inline]
    #[must_use]
    pub const fn case_insensitive(self) -> Self {
        Self {
            fold_case: true,
            ..self
        }
    }

    /// Key shape
    #[inline]
    #[must_use]
    pub const fn shape(&self) -> KeyShape {
        self.shape
    }

    /// Whether parts are lowercased
    #[inline]
    #[must_use]
    pub const fn folds_case(&self) -> bool {
        self.fold_case
    }

    /// Fields participating in the key
    #[must_use]
    pub fn fields(&self) -> &[&'static str] {
        match &self.shape {
            KeyShape::Field(f) => std::slice::from_ref(f),
            KeyShape::Composite(fs) | KeyShape::FirstOf(fs) => fs,
        }
    }

    /// Derive the normalised key
    ///
    /// Returns `None` when a needed part is missing.
    pub fn derive<'a, F>(&self, get: F) -> Option<String>
    where
        F: Fn(&str) -> Option<&'a FieldValue>,
    {
        let part = |field: &str| self.part(get(field));
        match self.shape {
            KeyShape::Field(f) => part(f),
            KeyShape::Composite(fs) => fs
                .iter()
                .map(|f| part(f))
                .collect::<Option<Vec<_>>>()
                .map(|parts| parts.join("::")),
            KeyShape::FirstOf(fs) => fs.iter().find_map(|f| part(f)),
        }
    }

    /// Whether two entities denote the same item
    ///
    /// For [`KeyShape::FirstOf`] the earliest field present on both sides
    /// decides, so a row first saved by name still matches once an email
    /// is added. Other shapes compare derived keys.
    pub fn matches<'a, 'b, A, B>(&self, left: A, right: B) -> bool
    where
        A: Fn(&str) -> Option<&'a FieldValue>,
        B: Fn(&str) -> Option<&'b FieldValue>,
    {
        match self.shape {
            KeyShape::FirstOf(fs) => fs
                .iter()
                .find_map(|f| Some((self.part(left(f))?, self.part(right(f))?)))
                .is_some_and(|(l, r)| l == r),
            KeyShape::Field(_) | KeyShape::Composite(_) => {
                matches!((self.derive(left), self.derive(right)), (Some(l), Some(r)) if l == r)
            }
        }
    }

    fn part(&self, value: Option<&FieldValue>) -> Option<String> {
        let text = value?.to_string();
        let text = text.trim();
        if text.is_empty() {
            None
        } else if self.fold_case {
            Some(text.to_lowercase())
        } else {
            Some(text.to_string())
        }
    }
}

/// Collection stage declaration
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    /// The stage-level collection key (required, kind `collection`)
    pub field: FieldSpec,
    /// Per-entity fields
    pub entity: Vec<FieldSpec>,
    /// Matching key
    pub natural_key: NaturalKey,
}

impl CollectionSpec {
    /// Entity field by canonical name
    #[must_use]
    pub fn entity_field(&self, name: &str) -> Option<&FieldSpec> {
        self.entity.iter().find(|f| f.name == name)
    }
}

/// Shape of a stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageShape {
    /// Bundle of scalar fields
    Scalar(Vec<FieldSpec>),
    /// One-to-many child entities
    Collection(CollectionSpec),
}

/// Declaration of one stage
#[derive(Debug, Clone, PartialEq)]
pub struct StageSchema {
    /// Stage
    pub stage: Stage,
    /// Fields or collection
    pub shape: StageShape,
}

impl StageSchema {
    /// Stage-level fields (the collection key alone for collection stages)
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        match &self.shape {
            StageShape::Scalar(fields) => fields,
            StageShape::Collection(c) => std::slice::from_ref(&c.field),
        }
    }

    /// Stage-level field by canonical name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Required-for-completion subset, in declaration order
    #[must_use]
    pub fn required_fields(&self) -> Vec<&'static str> {
        self.fields()
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect()
    }

    /// Collection declaration, for collection stages
    #[must_use]
    pub fn collection(&self) -> Option<&CollectionSpec> {
        match &self.shape {
            StageShape::Collection(c) => Some(c),
            StageShape::Scalar(_) => None,
        }
    }
}

/// Schema of a stage
#[inline]
#[must_use]
pub fn schema(stage: Stage) -> &'static StageSchema {
    &CATALOG[stage.index()]
}

/// All stage schemas in ordinal order
#[inline]
#[must_use]
pub fn catalog() -> &'static [StageSchema] {
    CATALOG.as_slice()
}

static CATALOG: Lazy<Vec<StageSchema>> = Lazy::new(|| {
    Stage::ALL
        .into_iter()
        .map(|stage| StageSchema {
            stage,
            shape: shape_of(stage),
        })
        .collect()
});

const PROPERTY_TYPES: &[&str] = &[
    "APARTMENT", "HOUSE", "VILLA", "CONDO", "TOWNHOUSE", "CABIN", "STUDIO", "OTHER",
];
const CONTACT_METHODS: &[&str] = &["EMAIL", "PHONE", "SMS"];
const FEE_TYPES: &[&str] = &["PERCENTAGE", "FLAT"];
const CANCELLATION_POLICIES: &[&str] = &["FLEXIBLE", "MODERATE", "STRICT"];
const ACCOUNT_TYPES: &[&str] = &["CHECKING", "SAVINGS", "BUSINESS"];
const PAYOUT_SCHEDULES: &[&str] = &["WEEKLY", "BIWEEKLY", "MONTHLY"];
const PLATFORMS: &[&str] = &["AIRBNB", "VRBO", "BOOKING_COM", "EXPEDIA", "DIRECT", "OTHER"];
const DOCUMENT_TYPES: &[&str] = &[
    "ID", "DEED", "INSURANCE", "CONTRACT", "TAX_FORM", "PERMIT", "OTHER",
];
const STAFF_ROLES: &[&str] = &[
    "CLEANER", "MAINTENANCE", "MANAGER", "CONCIERGE", "SECURITY", "OTHER",
];

fn int(min: Option<i64>) -> ValueRule {
    ValueRule::Integer { min, max: None }
}

fn decimal(min: Option<f64>, max: Option<f64>) -> ValueRule {
    ValueRule::Decimal { min, max }
}

#[allow(clippy::too_many_lines)]
fn shape_of(stage: Stage) -> StageShape {
    use ValueRule::{Boolean, Date, Email, Enum, Text, Url};

    match stage {
        Stage::Property => StageShape::Scalar(vec![
            FieldSpec::new("property_name", Text, &["name", "propertyName", "listing_name", "title"]).required(),
            FieldSpec::new("property_type", Enum(PROPERTY_TYPES), &["propertyType", "type"]).required(),
            FieldSpec::new("address_line1", Text, &["addressLine1", "address", "street", "street_address"]).required(),
            FieldSpec::new("address_line2", Text, &["addressLine2", "unit", "apartment"]),
            FieldSpec::new("city", Text, &["town", "locality"]).required(),
            FieldSpec::new("state", Text, &["region", "province"]),
            FieldSpec::new("postal_code", Text, &["postalCode", "zip", "zip_code", "zipCode"]),
            FieldSpec::new("country", Text, &["countryCode", "country_code"]).required(),
            FieldSpec::new("bedrooms", int(Some(0)), &["bedroomCount", "num_bedrooms"]).required(),
            FieldSpec::new("bathrooms", decimal(Some(0.0), None), &["bathroomCount", "num_bathrooms"]).required(),
            FieldSpec::new("max_guests", int(Some(1)), &["maxGuests", "guest_capacity", "capacity"]).required(),
            FieldSpec::new("square_feet", decimal(Some(0.0), None), &["squareFeet", "area"]),
            FieldSpec::new("description", Text, &["summary", "about"]),
        ]),
        Stage::Owner => StageShape::Scalar(vec![
            FieldSpec::new("first_name", Text, &["firstName", "given_name"]).required(),
            FieldSpec::new("last_name", Text, &["lastName", "surname", "family_name"]).required(),
            FieldSpec::new("email", Email, &["emailAddress", "email_address"]).required(),
            FieldSpec::new("phone", Text, &["phoneNumber", "phone_number", "mobile"]).required(),
            FieldSpec::new("company_name", Text, &["companyName", "company"]),
            FieldSpec::new("tax_id", Text, &["taxId", "ssn", "ein"]).sensitive(),
            FieldSpec::new("mailing_address", Text, &["mailingAddress"]),
            FieldSpec::new("preferred_contact", Enum(CONTACT_METHODS), &["preferredContact", "contact_method"]),
        ]),
        Stage::Contract => StageShape::Scalar(vec![
            FieldSpec::new("start_date", Date, &["startDate", "effective_date"]).required(),
            FieldSpec::new("end_date", Date, &["endDate"]),
            FieldSpec::new("commission_rate", decimal(Some(0.0), Some(100.0)), &["commissionRate", "commission", "fee_percent"]).required(),
            FieldSpec::new("management_fee_type", Enum(FEE_TYPES), &["feeType", "fee_type", "managementFeeType"]).required(),
            FieldSpec::new("minimum_stay_nights", int(Some(1)), &["minimumStay", "min_nights"]),
            FieldSpec::new("cancellation_policy", Enum(CANCELLATION_POLICIES), &["cancellationPolicy"]).required(),
            FieldSpec::new("auto_renew", Boolean, &["autoRenew"]),
            FieldSpec::new("signatory_name", Text, &["signatoryName", "signed_by"]),
        ]),
        Stage::Banking => StageShape::Scalar(vec![
            FieldSpec::new("account_holder_name", Text, &["accountHolderName", "account_name", "holder"]).required(),
            FieldSpec::new("bank_name", Text, &["bankName", "bank"]).required(),
            FieldSpec::new("account_number", Text, &["accountNumber", "account_no"]).required().sensitive(),
            FieldSpec::new("routing_number", Text, &["routingNumber", "aba", "sort_code"]).sensitive(),
            FieldSpec::new("iban", Text, &[]).sensitive(),
            FieldSpec::new("swift_code", Text, &["swiftCode", "bic"]),
            FieldSpec::new("account_type", Enum(ACCOUNT_TYPES), &["accountType"]).required(),
            FieldSpec::new("currency", Text, &["currencyCode"]),
            FieldSpec::new("payout_schedule", Enum(PAYOUT_SCHEDULES), &["payoutSchedule", "payout_frequency"]),
        ]),
        Stage::Credentials => StageShape::Collection(CollectionSpec {
            field: FieldSpec::new("credentials", ValueRule::Collection, &["channels", "platforms", "listings"]).required(),
            entity: vec![
                FieldSpec::new("platform", Enum(PLATFORMS), &["channel", "platformName"]).required(),
                FieldSpec::new("username", Text, &["login", "user", "email"]),
                FieldSpec::new("password", Text, &["secret"]).sensitive(),
                FieldSpec::new("listing_url", Url, &["listingUrl", "url"]),
                FieldSpec::new("listing_id", Text, &["listingId", "external_id"]),
                FieldSpec::new("is_active", Boolean, &["isActive", "active"]).default_to(FieldDefault::Boolean(true)),
            ],
            natural_key: NaturalKey::field("platform"),
        }),
        Stage::Documents => StageShape::Collection(CollectionSpec {
            field: FieldSpec::new("documents", ValueRule::Collection, &["files", "uploads"]).required(),
            entity: vec![
                FieldSpec::new("document_type", Enum(DOCUMENT_TYPES), &["documentType", "type", "category"]).required(),
                FieldSpec::new("file_name", Text, &["fileName", "name", "filename"]).required(),
                FieldSpec::new("storage_key", Text, &["storageKey", "key", "file_id"]),
                FieldSpec::new("uploaded_at", Date, &["uploadedAt"]),
                FieldSpec::new("notes", Text, &[]),
            ],
            natural_key: NaturalKey::composite(&["document_type", "file_name"]),
        }),
        Stage::Staff => StageShape::Collection(CollectionSpec {
            field: FieldSpec::new("staff", ValueRule::Collection, &["staffMembers", "staff_members", "team", "members"]).required(),
            entity: vec![
                FieldSpec::new("name", Text, &["fullName", "full_name"]).required(),
                FieldSpec::new("email", Email, &["emailAddress"]),
                FieldSpec::new("phone", Text, &["phoneNumber", "mobile"]),
                FieldSpec::new("role", Enum(STAFF_ROLES), &["position", "staffRole"]).required(),
                FieldSpec::new("is_primary_contact", Boolean, &["isPrimaryContact", "primary"]).default_to(FieldDefault::Boolean(false)),
            ],
            natural_key: NaturalKey::first_of(&["email", "name"]).case_insensitive(),
        }),
        Stage::Amenities => StageShape::Collection(CollectionSpec {
            field: FieldSpec::new("amenities", ValueRule::Collection, &["amenityList", "amenity_list", "checklist"]).required(),
            entity: vec![
                FieldSpec::new("category", Text, &["group", "section"]).required(),
                FieldSpec::new("item_name", Text, &["itemName", "name", "item"]).required(),
                FieldSpec::new("available", Boolean, &["isAvailable", "present", "has"]).default_to(FieldDefault::Boolean(true)),
                FieldSpec::new("quantity", int(Some(0)), &["count", "qty"]),
                FieldSpec::new("notes", Text, &[]),
            ],
            natural_key: NaturalKey::composite(&["category", "item_name"]).case_insensitive(),
        }),
        Stage::Photos => StageShape::Collection(CollectionSpec {
            field: FieldSpec::new("photos", ValueRule::Collection, &["images", "media", "gallery"]).required(),
            entity: vec![
                FieldSpec::new("url", Url, &["src", "photoUrl", "storage_url"]).required(),
                FieldSpec::new("caption", Text, &["title", "alt"]),
                FieldSpec::new("room", Text, &["area", "location"]),
                FieldSpec::new("is_cover", Boolean, &["isCover", "cover"]),
                FieldSpec::new("sort_order", int(Some(0)), &["sortOrder", "position", "order"]).default_to(FieldDefault::ElementIndex),
            ],
            natural_key: NaturalKey::field("url"),
        }),
        Stage::Review => StageShape::Scalar(vec![
            FieldSpec::new("acknowledged", Boolean, &["isAcknowledged", "confirm", "confirmed"]).required(),
            FieldSpec::new("agreed_to_terms", Boolean, &["agreedToTerms", "terms_accepted"]),
            FieldSpec::new("reviewer_notes", Text, &["notes", "comments"]),
        ]),
    }
}
