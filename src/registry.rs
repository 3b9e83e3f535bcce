//! Cache registry & draw dispatcher (spec §4.6, §4.7).

use alloc::vec::Vec;

use embedded_graphics::{primitives::Rectangle, text::Alignment};

use crate::builder::build_empty;
use crate::eviction::evict;
use crate::font_image::{offset_is_valid, FontImageDescriptor, CACHE_COUNT};
use crate::insert::add_glyphs;
use crate::lookup::find_offset_entry;
use crate::text::decode_codepoints;
use crate::Error;

/// The textual overflow-handling mode forwarded to the rasterizer. This
/// crate never interprets it; it is whatever the downstream renderer (an
/// external collaborator, spec.md §6) expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverflowMode(pub u8);

/// Opaque presentation attributes (color, underline/strikethrough flags,
/// ...) forwarded verbatim to the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextAttributes(pub u32);

/// Which per-thread registry a call operates on.
///
/// `Other` models a programming error: asking for fonts from a thread that
/// has no business drawing text (spec.md §6/§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadRole {
    MainApp,
    Overlay,
    Other,
}

/// The external collaborators spec.md §6 lists, bundled into one trait so a
/// single generic parameter threads them through the engine — the same
/// shape the teacher uses to thread a generic `DrawTarget` through
/// `PcfFontStyle`.
pub trait Environment {
    /// Graphics context type forwarded opaquely to [`Environment::rasterize`].
    type Ctx;

    /// Load a source font image by resource id. Ownership passes to the
    /// cache; the buffer is dropped once the call that requested it returns.
    fn load_resource(&mut self, id: u16) -> Result<Vec<u8>, Error>;

    /// Resolve a textual font key to a resource id, falling back to
    /// `FONT_FALLBACK` on an unknown key (spec.md §6) — the fallback
    /// behavior is this method's responsibility, not the cache's.
    fn resolve_font_key(&self, key: &str) -> u16;

    /// Which per-thread registry the calling thread owns.
    fn current_thread_role(&self) -> ThreadRole;

    /// A non-decreasing tick used to timestamp newly cached glyphs.
    fn monotonic_tick(&mut self) -> u32;

    /// Draw `text` using `font_image`, which is byte-compatible with the
    /// source font format whether it is a cache image or the untouched
    /// source font (the overflow-bypass path in spec.md §4.6 step 3).
    fn rasterize(
        &mut self,
        ctx: &mut Self::Ctx,
        text: &str,
        font_image: &[u8],
        area: Rectangle,
        overflow: OverflowMode,
        align: Alignment,
        attrs: TextAttributes,
    );
}

/// A mutable cache image plus its bookkeeping (spec.md §3 "Cache entry").
///
/// `image_size` is not stored separately: insertion only ever grows the
/// buffer by exactly the bytes a glyph needs (spec §4.4's edge cases are
/// filtered out before any allocation happens), so `image.len()` *is* the
/// used size at all times.
pub struct CacheEntry {
    resource_id: u16,
    image: Vec<u8>,
    cached_glyph_count: usize,
}

impl CacheEntry {
    pub fn resource_id(&self) -> u16 {
        self.resource_id
    }

    pub fn image_size(&self) -> usize {
        self.image.len()
    }

    pub fn cached_glyph_count(&self) -> usize {
        self.cached_glyph_count
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }
}

/// An opaque, stable handle to a loaded font; callers never index into the
/// underlying image directly (spec.md §6).
///
/// `FontHandle::SENTINEL` is returned when the thread role is unknown or the
/// source font could not be loaded — every operation on it is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontHandle(Option<u16>);

impl FontHandle {
    pub const SENTINEL: FontHandle = FontHandle(None);

    fn resource_id(self) -> Option<u16> {
        self.0
    }
}

/// One thread role's font cache: entries keyed by `resource_id`, at most one
/// per id (spec.md invariant I3). Insertion happens at the head and lookup
/// is a linear scan — a direct translation of the original's intrusive list,
/// which is adequate given the registry only ever holds a handful of fonts.
#[derive(Default)]
struct Registry {
    entries: Vec<CacheEntry>,
}

impl Registry {
    fn find_mut(&mut self, resource_id: u16) -> Option<&mut CacheEntry> {
        self.entries.iter_mut().find(|e| e.resource_id == resource_id)
    }

    fn contains(&self, resource_id: u16) -> bool {
        self.entries.iter().any(|e| e.resource_id == resource_id)
    }

    fn insert_at_head(&mut self, entry: CacheEntry) {
        self.entries.insert(0, entry);
    }

    fn remove_by_id(&mut self, resource_id: u16) {
        if let Some(pos) = self.entries.iter().position(|e| e.resource_id == resource_id) {
            self.entries.remove(pos);
        }
        // else: RemoveMissing — silent no-op, per spec.md §7.
    }

    fn remove_all(&mut self) {
        self.entries.clear();
    }
}

/// The two per-thread registries, owned by the caller instead of living as
/// process-global statics (spec.md §9 design note: "replace with a single
/// structure holding two sub-registries"). Pass the same instance to every
/// call on a given thread.
#[derive(Default)]
pub struct ThreadRegistries {
    main_app: Registry,
    overlay: Registry,
}

impl ThreadRegistries {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry_for(&mut self, role: ThreadRole) -> Result<&mut Registry, Error> {
        match role {
            ThreadRole::MainApp => Ok(&mut self.main_app),
            ThreadRole::Overlay => Ok(&mut self.overlay),
            ThreadRole::Other => {
                log::error!("font cache: current_thread_role() returned Other");
                Err(Error::UnknownThreadRole)
            }
        }
    }

    /// Load (or return the already-cached) entry for `resource_id` on the
    /// calling thread's registry.
    pub fn load_font_by_id<E: Environment>(&mut self, env: &mut E, resource_id: u16) -> FontHandle {
        let role = env.current_thread_role();
        let registry = match self.registry_for(role) {
            Ok(registry) => registry,
            Err(_) => return FontHandle::SENTINEL,
        };

        if !registry.contains(resource_id) {
            match Self::build_entry(env, resource_id) {
                Ok(entry) => registry.insert_at_head(entry),
                Err(_) => {
                    log::error!("font cache: failed to load resource {resource_id}");
                    return FontHandle::SENTINEL;
                }
            }
        }
        FontHandle(Some(resource_id))
    }

    /// Look up the entry backing an already-loaded handle, on the calling
    /// thread's registry. Returns `None` for a sentinel handle, an entry on
    /// a different thread role's registry, or an unknown thread role.
    pub fn entry<E: Environment>(&mut self, env: &E, handle: FontHandle) -> Option<&CacheEntry> {
        let resource_id = handle.resource_id()?;
        let role = env.current_thread_role();
        let registry = self.registry_for(role).ok()?;
        registry.find_mut(resource_id).map(|e| &*e)
    }

    /// As [`Self::load_font_by_id`], but resolving a textual font key first.
    pub fn load_font_by_key<E: Environment>(&mut self, env: &mut E, key: &str) -> FontHandle {
        let resource_id = env.resolve_font_key(key);
        self.load_font_by_id(env, resource_id)
    }

    fn build_entry<E: Environment>(env: &mut E, resource_id: u16) -> Result<CacheEntry, Error> {
        let source = env.load_resource(resource_id)?;
        let image = build_empty(&source)?;
        Ok(CacheEntry {
            resource_id,
            image,
            cached_glyph_count: 0,
        })
    }

    /// Detach and release the entry for `resource_id`, if any.
    pub fn remove_by_id<E: Environment>(&mut self, env: &E, resource_id: u16) {
        let role = env.current_thread_role();
        if let Ok(registry) = self.registry_for(role) {
            registry.remove_by_id(resource_id);
        }
    }

    /// Detach and release every entry on the calling thread's registry.
    pub fn remove_all<E: Environment>(&mut self, env: &E) {
        let role = env.current_thread_role();
        if let Ok(registry) = self.registry_for(role) {
            registry.remove_all();
        }
    }

    /// Draw `text` against `handle`'s cache image, growing and evicting as
    /// needed, or bypassing the cache entirely for this call when the text
    /// alone overflows capacity (spec.md §4.6).
    #[allow(clippy::too_many_arguments)]
    pub fn draw_text<E: Environment>(
        &mut self,
        env: &mut E,
        ctx: &mut E::Ctx,
        text: &str,
        handle: FontHandle,
        area: Rectangle,
        overflow: OverflowMode,
        align: Alignment,
        attrs: TextAttributes,
    ) -> Result<(), Error> {
        let Some(resource_id) = handle.resource_id() else {
            return Ok(()); // sentinel handle: subsequent operations are no-ops
        };

        let role = env.current_thread_role();
        let registry = self.registry_for(role)?;
        let entry = registry
            .find_mut(resource_id)
            .ok_or(Error::MalformedFont)?;

        draw_on_entry(env, ctx, text, entry, area, overflow, align, attrs)
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_on_entry<E: Environment>(
    env: &mut E,
    ctx: &mut E::Ctx,
    text: &str,
    entry: &mut CacheEntry,
    area: Rectangle,
    overflow: OverflowMode,
    align: Alignment,
    attrs: TextAttributes,
) -> Result<(), Error> {
    let mut to_add: Vec<u32> = Vec::new();
    let mut already_present: Vec<u32> = Vec::new();

    let desc = FontImageDescriptor::parse(&entry.image)?;
    for codepoint in decode_codepoints(text) {
        if to_add.contains(&codepoint) || already_present.contains(&codepoint) {
            continue;
        }
        // The tofu alias codepoint itself is always considered resident.
        if codepoint == 4 {
            already_present.push(codepoint);
            continue;
        }
        let present = match find_offset_entry(&desc, &entry.image, codepoint)? {
            Some(addr) => offset_is_valid(desc.read_offset(&entry.image, addr)?),
            None => false,
        };
        if present {
            already_present.push(codepoint);
        } else {
            to_add.push(codepoint);
        }
    }

    if to_add.len() + already_present.len() > CACHE_COUNT
        || to_add.len() > CACHE_COUNT
        || already_present.len() > CACHE_COUNT
    {
        log::info!("font cache: {} unique codepoints exceed CACHE_COUNT, bypassing cache", to_add.len() + already_present.len());
        let raw = env.load_resource(entry.resource_id)?;
        env.rasterize(ctx, text, &raw, area, overflow, align, attrs);
        return Ok(());
    }

    if to_add.is_empty() {
        env.rasterize(ctx, text, &entry.image, area, overflow, align, attrs);
        return Ok(());
    }

    let source = env.load_resource(entry.resource_id)?;
    let tick = env.monotonic_tick();

    if entry.cached_glyph_count + to_add.len() > CACHE_COUNT {
        let remove_count = entry.cached_glyph_count + to_add.len() - CACHE_COUNT;
        evict(
            &mut entry.image,
            &mut entry.cached_glyph_count,
            &source,
            &already_present,
            remove_count,
            tick,
        )?;
    }

    add_glyphs(
        &mut entry.image,
        &mut entry.cached_glyph_count,
        &source,
        &to_add,
        tick,
    )?;

    env.rasterize(ctx, text, &entry.image, area, overflow, align, attrs);
    Ok(())
}
